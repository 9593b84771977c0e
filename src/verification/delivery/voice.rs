use super::{build_client, Channel, CodeSender, DeliveryError};
use crate::phone;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};
use uuid::Uuid;

const INFORMER_CALL_METHOD: &str = "start.informer_call";

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'static str,
    params: InformerCallParams<'a>,
    id: String,
}

#[derive(Debug, Serialize)]
struct InformerCallParams<'a> {
    access_token: &'a str,
    virtual_phone_number: &'a str,
    contact: String,
    contact_message: ContactMessage,
}

#[derive(Debug, Serialize)]
struct ContactMessage {
    #[serde(rename = "type")]
    kind: &'static str,
    value: String,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    result: Option<JsonRpcResult>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResult {
    data: Option<CallSession>,
}

#[derive(Debug, Deserialize)]
struct CallSession {
    call_session_id: i64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// Novofon-style voice informer: the provider calls the user and reads the
/// code out with text-to-speech.
pub struct VoiceCallSender {
    client: reqwest::Client,
    api_url: String,
    access_token: String,
    virtual_number: String,
}

impl VoiceCallSender {
    pub fn new(
        api_url: &str,
        access_token: &str,
        virtual_number: &str,
        timeout: Duration,
    ) -> Result<Self, DeliveryError> {
        Ok(Self {
            client: build_client(timeout)?,
            api_url: api_url.to_string(),
            access_token: access_token.to_string(),
            virtual_number: virtual_number.to_string(),
        })
    }

    /// Digits are spaced so the speech engine reads them one by one.
    pub fn tts_message(code: &str) -> String {
        let spaced = code
            .chars()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        format!(
            "Ваш код подтверждения: {}. Повторяю: {}.",
            spaced, spaced
        )
    }
}

#[async_trait]
impl CodeSender for VoiceCallSender {
    fn channel(&self) -> Channel {
        Channel::Voice
    }

    async fn send_code(&self, phone: &str, code: &str) -> Result<(), DeliveryError> {
        let contact = phone::api_digits(phone);
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method: INFORMER_CALL_METHOD,
            params: InformerCallParams {
                access_token: &self.access_token,
                virtual_phone_number: &self.virtual_number,
                contact,
                contact_message: ContactMessage {
                    kind: "tts",
                    value: Self::tts_message(code),
                },
            },
            id: Uuid::new_v4().to_string(),
        };

        info!(phone, request_id = %request.id, "Starting verification call");

        let response = self
            .client
            .post(&self.api_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| DeliveryError::TransportError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            error!(phone, %status, "Voice provider rejected request");
            return Err(DeliveryError::StatusError(status.as_u16()));
        }

        let body: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| DeliveryError::UnexpectedResponse(e.to_string()))?;

        if let Some(rpc_error) = body.error {
            error!(
                phone,
                error_code = rpc_error.code,
                reason = %rpc_error.message,
                "Voice provider returned error"
            );
            return Err(DeliveryError::ProviderError {
                code: rpc_error.code,
                message: rpc_error.message,
            });
        }

        match body.result.and_then(|result| result.data) {
            Some(session) => {
                info!(
                    phone,
                    call_session_id = session.call_session_id,
                    "Verification call started"
                );
                Ok(())
            }
            None => Err(DeliveryError::UnexpectedResponse(
                "response carries neither result nor error".to_string(),
            )),
        }
    }
}
