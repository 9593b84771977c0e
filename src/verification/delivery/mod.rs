use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub mod sms;
pub mod voice;

pub use sms::SmsSender;
pub use voice::VoiceCallSender;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Failed to build HTTP client: {0}")]
    ClientError(String),
    #[error("Request to provider failed: {0}")]
    TransportError(String),
    #[error("Provider responded with status {0}")]
    StatusError(u16),
    #[error("Provider error {code}: {message}")]
    ProviderError { code: i64, message: String },
    #[error("Unexpected provider response: {0}")]
    UnexpectedResponse(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Sms,
    Voice,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Sms => write!(f, "sms"),
            Channel::Voice => write!(f, "voice"),
        }
    }
}

/// Delivers a verification code to a phone over a single channel.
#[async_trait]
pub trait CodeSender: Send + Sync {
    fn channel(&self) -> Channel;

    /// `phone` is already normalized.
    async fn send_code(&self, phone: &str, code: &str) -> Result<(), DeliveryError>;
}

pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client, DeliveryError> {
    reqwest::Client::builder()
        .user_agent(concat!("qrgate/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
        .map_err(|e| DeliveryError::ClientError(e.to_string()))
}
