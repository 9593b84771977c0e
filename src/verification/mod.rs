use crate::core::clock::Clock;
use crate::phone::{self, PhoneError};
use rand::Rng;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

pub mod delivery;
pub mod store;

pub use delivery::{Channel, CodeSender, DeliveryError};
pub use store::{CodeCheck, MemoryOtpStore, OtpStore};

#[derive(Debug, Error)]
pub enum VerificationError {
    #[error(transparent)]
    Phone(#[from] PhoneError),
    #[error("Code delivery failed: {0}")]
    Delivery(#[from] DeliveryError),
    #[error("Code length must be positive")]
    InvalidCodeLength,
}

/// Issues and checks one-time codes for phone ownership.
///
/// `verify` never consumes a code. Callers that accept a code must clear it,
/// which `consume` does in one step.
pub struct VerificationService {
    sender: Arc<dyn CodeSender>,
    store: Arc<dyn OtpStore>,
    clock: Arc<dyn Clock>,
    code_length: usize,
}

impl VerificationService {
    pub fn new(
        sender: Arc<dyn CodeSender>,
        store: Arc<dyn OtpStore>,
        clock: Arc<dyn Clock>,
        code_length: usize,
    ) -> Result<Self, VerificationError> {
        if code_length == 0 {
            return Err(VerificationError::InvalidCodeLength);
        }
        Ok(Self {
            sender,
            store,
            clock,
            code_length,
        })
    }

    pub fn channel(&self) -> Channel {
        self.sender.channel()
    }

    /// Sends a fresh code and returns the normalized phone it was sent to.
    pub async fn send(&self, raw_phone: &str) -> Result<String, VerificationError> {
        let phone = phone::normalize(raw_phone)?;
        let code = generate_code(self.code_length);

        self.sender.send_code(&phone, &code).await?;
        self.store.put(&phone, code, self.clock.now());

        info!(phone, channel = %self.sender.channel(), "Verification code sent");
        Ok(phone)
    }

    pub fn verify(&self, raw_phone: &str, code: &str) -> bool {
        match phone::normalize(raw_phone) {
            Ok(phone) => report(&phone, self.store.check(&phone, code, self.clock.now())),
            Err(e) => {
                warn!(error = %e, "Verification attempted with invalid phone");
                false
            }
        }
    }

    pub fn clear(&self, raw_phone: &str) {
        if let Ok(phone) = phone::normalize(raw_phone) {
            if self.store.remove(&phone) {
                info!(phone, "Verification code cleared");
            }
        }
    }

    /// Verifies and, on success, clears the code so it cannot be replayed.
    /// Of several concurrent calls with the same code at most one succeeds.
    pub fn consume(&self, raw_phone: &str, code: &str) -> bool {
        match phone::normalize(raw_phone) {
            Ok(phone) => report(&phone, self.store.take(&phone, code, self.clock.now())),
            Err(e) => {
                warn!(error = %e, "Verification attempted with invalid phone");
                false
            }
        }
    }

    pub fn purge_expired(&self) -> usize {
        self.store.purge_expired(self.clock.now())
    }
}

fn report(phone: &str, check: CodeCheck) -> bool {
    match check {
        CodeCheck::Valid => {
            info!(phone, "Verification code accepted");
            true
        }
        CodeCheck::Mismatch => {
            warn!(phone, "Verification code mismatch");
            false
        }
        CodeCheck::Expired => {
            warn!(phone, "Verification code expired");
            false
        }
        CodeCheck::Missing => {
            warn!(phone, "No verification code pending");
            false
        }
    }
}

pub fn generate_code(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}
