use crate::configuration::Context;
use crate::core::service_manager::{Error as ServiceManagerError, Service};
use crate::web::{self, AppState};
use async_trait::async_trait;
use tokio::net::TcpListener;
use tracing::info;

/// Serves the JSON API on the configured port.
pub struct HttpService {
    port: u16,
    state: AppState,
}

#[async_trait]
impl Service for HttpService {
    type Context = Context;

    async fn new(context: Context) -> Self {
        Self {
            port: context.config.server.port,
            state: context.app_state(),
        }
    }

    async fn run(self) -> Result<(), ServiceManagerError> {
        let app = web::router(self.state);

        let listener = TcpListener::bind(format!("0.0.0.0:{}", self.port))
            .await
            .map_err(|e| ServiceManagerError::new(&format!("Failed to bind port: {}", e)))?;

        info!("HTTP server running on port {}", self.port);

        axum::serve(listener, app)
            .await
            .map_err(|e| ServiceManagerError::new(&format!("HTTP server error: {}", e)))
    }
}
