use crate::configuration::Context;
use crate::core::service_manager::{Error as ServiceManagerError, Service};
use crate::verification::VerificationService;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::debug;

/// Drops expired verification codes that nobody came back for.
pub struct OtpSweeper {
    verification: Arc<VerificationService>,
    interval: Duration,
}

impl OtpSweeper {
    pub fn sweep(&self) -> usize {
        let purged = self.verification.purge_expired();
        if purged > 0 {
            debug!(purged, "Expired verification codes removed");
        }
        purged
    }
}

#[async_trait]
impl Service for OtpSweeper {
    type Context = Context;

    async fn new(context: Context) -> Self {
        Self {
            verification: context.verification.clone(),
            interval: Duration::from_secs(context.config.verification.sweep_interval_secs),
        }
    }

    async fn run(self) -> Result<(), ServiceManagerError> {
        if self.interval.is_zero() {
            return Ok(());
        }

        let mut ticker = time::interval(self.interval);
        loop {
            ticker.tick().await;
            self.sweep();
        }
    }
}
