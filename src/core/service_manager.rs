use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{error, info};

#[derive(Error, Debug)]
#[error("{0}")]
pub struct Error(String);

impl Error {
    pub fn new(s: &str) -> Error {
        Error(s.to_string())
    }

    pub fn from<E: std::error::Error>(e: E) -> Self {
        Self(e.to_string())
    }
}

#[async_trait]
pub trait Service {
    type Context: Clone + Send;
    async fn new(context: Self::Context) -> Self;
    async fn run(self) -> Result<(), Error>;
}

const RESTART_DELAY: Duration = Duration::from_secs(5);

/// Runs long-lived services side by side. A service that fails is built
/// again from the shared context and restarted after a delay.
pub struct ServiceManager<C> {
    context: C,
    services: JoinSet<()>,
    restart_delay: Duration,
}

impl<C> ServiceManager<C>
where
    C: 'static + Clone + Send,
{
    pub fn new(context: C) -> Self {
        Self::with_restart_delay(context, RESTART_DELAY)
    }

    pub fn with_restart_delay(context: C, restart_delay: Duration) -> Self {
        Self {
            context,
            services: JoinSet::new(),
            restart_delay,
        }
    }

    pub fn spawn<T: Service<Context = C> + Send + 'static>(&mut self) {
        let context = self.context.clone();
        let restart_delay = self.restart_delay;
        self.services.spawn(async move {
            loop {
                let service = T::new(context.clone()).await;
                match service.run().await {
                    Ok(()) => break,
                    Err(e) => {
                        let service = std::any::type_name::<T>();
                        error!(
                            service,
                            error = %e,
                            delay_ms = restart_delay.as_millis() as u64,
                            "Service failed, restarting"
                        );
                        tokio::time::sleep(restart_delay).await;
                    }
                }
            }
        });
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Returns once any service stops for good.
    pub async fn wait(&mut self) -> Result<(), Error> {
        if self.services.join_next().await.is_some() {
            info!("Service stopped");
            return Err(Error::new("Internal Service Error"));
        }
        Ok(())
    }
}
