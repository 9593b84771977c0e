use super::{AccountError, AccountService};
use crate::access;
use crate::auth;
use crate::core::clock::Clock;
use crate::database::{User, UserRepository};
use crate::telegram::TelegramAuthPayload;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use tracing::{info, warn};
use uuid::Uuid;

const PLACEHOLDER_PREFIX: &str = "tg:";

/// Stands in for the phone of an account created from Telegram until the
/// owner verifies a real one. Never a normalized phone, so no phone login
/// can land on it.
pub fn placeholder_phone() -> String {
    let mut rng = rand::rng();
    let digits: String = (0..10)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect();
    format!("{}{}", PLACEHOLDER_PREFIX, digits)
}

pub fn random_password() -> String {
    let mut bytes = [0u8; 24];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

impl AccountService {
    fn checked_telegram_id(&self, payload: &TelegramAuthPayload) -> Result<i64, AccountError> {
        if !self.telegram.validate(payload, self.clock.now()) {
            return Err(AccountError::InvalidTelegramAuth);
        }
        payload
            .telegram_id()
            .ok_or(AccountError::InvalidTelegramAuth)
    }

    /// Signs in through the Login Widget. Unknown Telegram users get a
    /// temporary account that still needs a verified phone.
    pub async fn telegram_login(&self, payload: TelegramAuthPayload) -> Result<User, AccountError> {
        let telegram_id = self.checked_telegram_id(&payload)?;

        if let Some(mut user) = self.store.find_user_by_telegram_id(telegram_id).await? {
            let mut changed = false;
            if payload.username.is_some() && user.telegram_username != payload.username {
                user.telegram_username = payload.username.clone();
                changed = true;
            }
            if let Some(code) = &payload.referral_code {
                changed |= access::grant(&mut user, code);
            }
            if changed {
                self.store.update_user(&user).await?;
            }

            info!(user_id = %user.id, telegram_id, "User signed in with Telegram");
            return Ok(user);
        }

        let password_hash = auth::hash_password(&random_password())?;
        let mut user = User::new(&self.free_placeholder_phone().await?, &password_hash);
        user.telegram_id = Some(telegram_id);
        user.telegram_username = payload.username.clone();
        if let Some(code) = &payload.referral_code {
            access::grant(&mut user, code);
        }
        self.store.insert_user(&user).await?;

        info!(user_id = %user.id, telegram_id, "Temporary Telegram account created");
        Ok(user)
    }

    async fn free_placeholder_phone(&self) -> Result<String, AccountError> {
        loop {
            let phone = placeholder_phone();
            if self.store.find_user_by_phone(&phone).await?.is_none() {
                return Ok(phone);
            }
        }
    }

    pub async fn link_telegram(
        &self,
        user_id: Uuid,
        payload: TelegramAuthPayload,
    ) -> Result<User, AccountError> {
        let telegram_id = self.checked_telegram_id(&payload)?;
        let mut user = self.find_user(user_id).await?;

        if let Some(owner) = self.store.find_user_by_telegram_id(telegram_id).await? {
            if owner.id != user.id {
                warn!(user_id = %user.id, telegram_id, "Telegram account owned by another user");
                return Err(AccountError::TelegramAlreadyLinked);
            }
        }

        user.telegram_id = Some(telegram_id);
        user.telegram_username = payload.username.clone();
        self.store.update_user(&user).await?;

        info!(user_id = %user.id, telegram_id, "Telegram account linked");
        Ok(user)
    }

    pub async fn unlink_telegram(&self, user_id: Uuid) -> Result<User, AccountError> {
        let mut user = self.find_user(user_id).await?;
        if user.telegram_id.is_none() {
            return Ok(user);
        }

        user.telegram_id = None;
        user.telegram_username = None;
        self.store.update_user(&user).await?;

        info!(user_id = %user.id, "Telegram account unlinked");
        Ok(user)
    }
}
