use crate::auth::{self, AuthError};
use crate::core::clock::Clock;
use crate::database::{DatabaseError, Store, User, UserRepository};
use crate::phone::{self, PhoneError};
use crate::telegram::TelegramValidator;
use crate::verification::{Channel, DeliveryError, VerificationError, VerificationService};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

pub mod admin;
mod merge;
mod referral;
mod telegram;

pub use admin::InstructionDraft;
pub use merge::{ensure_temporary, merge_into, CompleteRegistration};
pub use referral::Redemption;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Phone(#[from] PhoneError),
    #[error("Invalid verification code")]
    InvalidCode,
    #[error("Code delivery failed: {0}")]
    Delivery(#[from] DeliveryError),
    #[error("Telegram authorization failed")]
    InvalidTelegramAuth,
    #[error("Invalid phone or password")]
    InvalidCredentials,
    #[error("This Telegram account is already linked to another user")]
    TelegramAlreadyLinked,
    #[error("User not found")]
    UserNotFound,
    #[error("Instruction not found")]
    InstructionNotFound,
    #[error("Authentication required")]
    Unauthenticated,
    #[error("Access denied")]
    AccessDenied,
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<VerificationError> for AccountError {
    fn from(error: VerificationError) -> Self {
        match error {
            VerificationError::Phone(e) => AccountError::Phone(e),
            VerificationError::Delivery(e) => AccountError::Delivery(e),
            e @ VerificationError::InvalidCodeLength => AccountError::Validation(e.to_string()),
        }
    }
}

/// Phone sign-up or sign-in confirmed with a one-time code.
#[derive(Debug, Clone, Deserialize)]
pub struct PhoneRegistration {
    pub phone: String,
    pub code: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub referral_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordLogin {
    pub phone: String,
    pub password: String,
}

pub fn validate_password(password: &str) -> Result<(), AccountError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AccountError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Registration, login and access flows on top of the store, the OTP
/// service and the Telegram validator.
pub struct AccountService {
    store: Arc<dyn Store>,
    verification: Arc<VerificationService>,
    telegram: TelegramValidator,
    clock: Arc<dyn Clock>,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn Store>,
        verification: Arc<VerificationService>,
        telegram: TelegramValidator,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            verification,
            telegram,
            clock,
        }
    }

    pub fn code_channel(&self) -> Channel {
        self.verification.channel()
    }

    pub async fn find_user(&self, id: Uuid) -> Result<User, AccountError> {
        self.store
            .find_user(id)
            .await?
            .ok_or(AccountError::UserNotFound)
    }

    /// Sends a code and returns the normalized phone it went to.
    pub async fn request_phone_code(&self, raw_phone: &str) -> Result<String, AccountError> {
        Ok(self.verification.send(raw_phone).await?)
    }

    pub async fn register_or_login_with_phone(
        &self,
        request: PhoneRegistration,
    ) -> Result<User, AccountError> {
        let phone = phone::normalize(&request.phone)?;
        let existing = self.store.find_user_by_phone(&phone).await?;

        // checked before the code is spent
        if existing.is_none() {
            validate_password(&request.password)?;
        }
        if !self.verification.consume(&phone, request.code.trim()) {
            return Err(AccountError::InvalidCode);
        }

        match existing {
            Some(mut user) => {
                if !request.password.is_empty()
                    && !auth::verify_password(&user.password_hash, &request.password)
                {
                    warn!(phone, "Wrong password for verified phone");
                    return Err(AccountError::InvalidCredentials);
                }

                let mut changed = !user.phone_verified;
                user.phone_verified = true;
                if let Some(code) = &request.referral_code {
                    changed |= crate::access::grant(&mut user, code);
                }
                if changed {
                    self.store.update_user(&user).await?;
                }

                info!(user_id = %user.id, "User signed in with phone");
                Ok(user)
            }
            None => {
                let password_hash = auth::hash_password(&request.password)?;
                let mut user = User::new(&phone, &password_hash);
                user.phone_verified = true;
                if let Some(code) = &request.referral_code {
                    crate::access::grant(&mut user, code);
                }
                self.store.insert_user(&user).await?;

                info!(user_id = %user.id, phone, "User registered with phone");
                Ok(user)
            }
        }
    }

    pub async fn login_with_password(&self, request: PasswordLogin) -> Result<User, AccountError> {
        let phone = phone::normalize(&request.phone)?;
        let user = self
            .store
            .find_user_by_phone(&phone)
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        if !auth::verify_password(&user.password_hash, &request.password) {
            warn!(phone, "Password login rejected");
            return Err(AccountError::InvalidCredentials);
        }

        info!(user_id = %user.id, "User signed in with password");
        Ok(user)
    }
}
