use super::{build_client, Channel, CodeSender, DeliveryError};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info};

// fmt=3 asks the gateway for a JSON reply
#[derive(Debug, Deserialize)]
struct SmsGatewayResponse {
    id: Option<i64>,
    cnt: Option<i64>,
    error: Option<String>,
    error_code: Option<i64>,
}

/// SMSC-style HTTP gateway: one GET per message, credentials in the query.
pub struct SmsSender {
    client: reqwest::Client,
    api_url: String,
    login: String,
    password: String,
}

impl SmsSender {
    pub fn new(
        api_url: &str,
        login: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<Self, DeliveryError> {
        Ok(Self {
            client: build_client(timeout)?,
            api_url: api_url.to_string(),
            login: login.to_string(),
            password: password.to_string(),
        })
    }

    pub fn message_text(code: &str) -> String {
        format!("Код подтверждения: {}", code)
    }
}

#[async_trait]
impl CodeSender for SmsSender {
    fn channel(&self) -> Channel {
        Channel::Sms
    }

    async fn send_code(&self, phone: &str, code: &str) -> Result<(), DeliveryError> {
        let message = Self::message_text(code);
        info!(phone, "Sending verification SMS");

        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("login", self.login.as_str()),
                ("psw", self.password.as_str()),
                ("phones", phone),
                ("mes", message.as_str()),
                ("fmt", "3"),
            ])
            .send()
            .await
            .map_err(|e| DeliveryError::TransportError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            error!(phone, %status, "SMS gateway rejected request");
            return Err(DeliveryError::StatusError(status.as_u16()));
        }

        let body: SmsGatewayResponse = response
            .json()
            .await
            .map_err(|e| DeliveryError::UnexpectedResponse(e.to_string()))?;

        if let Some(message) = body.error {
            let error_code = body.error_code.unwrap_or_default();
            error!(phone, error_code, reason = %message, "SMS gateway returned error");
            return Err(DeliveryError::ProviderError {
                code: error_code,
                message,
            });
        }

        match body.id {
            Some(id) => {
                info!(phone, id, parts = body.cnt.unwrap_or(1), "SMS accepted by gateway");
                Ok(())
            }
            None => Err(DeliveryError::UnexpectedResponse(
                "missing message id".to_string(),
            )),
        }
    }
}
