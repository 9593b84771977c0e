use dotenvy::dotenv;
use qrgate::configuration::Context;
use qrgate::core::{HttpService, OtpSweeper, ServiceManager};
use qrgate::AppError;
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenv().ok();
    let context =
        Context::new("config.json").map_err(|e| AppError::ConfigError(e.to_string()))?;

    let log_level = Level::from_str(&context.config.log_level).unwrap_or(Level::INFO);
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::new(log_level.to_string()))
        .init();
    tracing::info!(
        channel = %context.verification.channel(),
        "Starting qrgate"
    );

    let sweep_enabled = context.config.verification.sweep_interval_secs > 0;
    let mut service_manager = ServiceManager::new(context);
    service_manager.spawn::<HttpService>();
    if sweep_enabled {
        service_manager.spawn::<OtpSweeper>();
    }

    service_manager
        .wait()
        .await
        .map_err(|_| AppError::ServiceError)
}
