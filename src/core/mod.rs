pub mod clock;
pub mod http_server;
pub mod otp_sweeper;
pub mod service_manager;

pub use clock::{Clock, ManualClock, SystemClock};
pub use http_server::HttpService;
pub use otp_sweeper::OtpSweeper;
pub use service_manager::{Service, ServiceManager};
