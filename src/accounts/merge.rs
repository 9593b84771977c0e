use super::{validate_password, AccountError, AccountService};
use crate::access;
use crate::auth;
use crate::database::{User, UserRepository};
use crate::phone;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

/// Phone completion for an account created from Telegram.
#[derive(Debug, Clone, Deserialize)]
pub struct CompleteRegistration {
    pub phone: String,
    pub code: String,
    pub password: String,
    #[serde(default)]
    pub referral_code: Option<String>,
}

/// Folds the temporary Telegram account into the phone account that is kept.
///
/// The result carries the Telegram identity of `temporary`, both code sets
/// plus `extra_code`, the new password hash and a verified phone. Everything
/// else comes from `retained`.
pub fn merge_into(
    mut retained: User,
    temporary: &User,
    password_hash: &str,
    extra_code: Option<&str>,
) -> User {
    retained.telegram_id = temporary.telegram_id;
    retained.telegram_username = temporary.telegram_username.clone();
    retained.referral_codes = access::union(&retained.referral_codes, &temporary.referral_codes);
    if let Some(code) = extra_code {
        access::grant(&mut retained, code);
    }
    retained.password_hash = password_hash.to_string();
    retained.phone_verified = true;
    retained
}

/// Only accounts from the Telegram flow may complete registration; anything
/// else would be folded into another account and deleted.
pub fn ensure_temporary(user: &User) -> Result<(), AccountError> {
    if user.is_temporary() {
        return Ok(());
    }
    warn!(user_id = %user.id, "Registration completion refused for non-temporary account");
    Err(AccountError::AccessDenied)
}

impl AccountService {
    /// Sends a completion code to the owner of a temporary account.
    pub async fn request_completion_code(
        &self,
        temp_user_id: Uuid,
        raw_phone: &str,
    ) -> Result<String, AccountError> {
        ensure_temporary(&self.find_user(temp_user_id).await?)?;
        self.request_phone_code(raw_phone).await
    }

    /// Attaches a verified phone to the temporary account `temp_user_id`.
    /// When the phone already belongs to someone else that account is kept
    /// and the temporary one is removed in the same transaction.
    pub async fn complete_registration(
        &self,
        temp_user_id: Uuid,
        request: CompleteRegistration,
    ) -> Result<User, AccountError> {
        let temporary = self.find_user(temp_user_id).await?;
        ensure_temporary(&temporary)?;
        validate_password(&request.password)?;
        let phone = phone::normalize(&request.phone)?;

        if !self.verification.consume(&phone, request.code.trim()) {
            return Err(AccountError::InvalidCode);
        }

        let password_hash = auth::hash_password(&request.password)?;
        let extra_code = request.referral_code.as_deref();

        match self.store.find_user_by_phone(&phone).await? {
            Some(existing) if existing.id != temporary.id => {
                let merged = merge_into(existing, &temporary, &password_hash, extra_code);
                self.store.merge_accounts(&merged, temporary.id).await?;

                info!(
                    user_id = %merged.id,
                    discarded = %temporary.id,
                    telegram_id = ?merged.telegram_id,
                    "Telegram account merged into phone account"
                );
                Ok(merged)
            }
            _ => {
                let mut user = temporary;
                user.phone = phone;
                user.password_hash = password_hash;
                user.phone_verified = true;
                if let Some(code) = extra_code {
                    access::grant(&mut user, code);
                }
                self.store.update_user(&user).await?;

                info!(user_id = %user.id, "Registration completed with phone");
                Ok(user)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::fixture;
    use super::*;

    const PHONE: &str = "+79991234567";

    fn request(code: &str, referral: Option<&str>) -> CompleteRegistration {
        CompleteRegistration {
            phone: PHONE.to_string(),
            code: code.to_string(),
            password: "secret1".to_string(),
            referral_code: referral.map(str::to_string),
        }
    }

    #[test]
    fn test_merge_into() {
        let mut retained = User::new(PHONE, "old-hash");
        retained.referral_codes = "A1".to_string();
        let mut temporary = User::new("+70000000001", "temp-hash");
        temporary.telegram_id = Some(42);
        temporary.telegram_username = Some("ivan".to_string());
        temporary.referral_codes = "B2".to_string();

        let merged = merge_into(retained.clone(), &temporary, "new-hash", Some("C3"));

        assert_eq!(merged.id, retained.id);
        assert_eq!(merged.phone, PHONE);
        assert_eq!(merged.telegram_id, Some(42));
        assert_eq!(merged.telegram_username.as_deref(), Some("ivan"));
        assert_eq!(merged.referral_codes, "A1,B2,C3");
        assert_eq!(merged.password_hash, "new-hash");
        assert!(merged.phone_verified);
    }

    #[tokio::test]
    async fn test_completion_without_conflict_updates_in_place() {
        let f = fixture();
        let temporary = f
            .accounts
            .telegram_login(f.signed_payload(42, "ivan"))
            .await
            .unwrap();
        let code = f.code_for(PHONE).await;

        let user = f
            .accounts
            .complete_registration(temporary.id, request(&code, Some("QR-1")))
            .await
            .unwrap();

        assert_eq!(user.id, temporary.id);
        assert_eq!(user.phone, PHONE);
        assert!(user.phone_verified);
        assert_eq!(user.referral_codes, "QR-1");
        assert!(auth::verify_password(&user.password_hash, "secret1"));
    }

    #[tokio::test]
    async fn test_completion_merges_into_phone_account() {
        let f = fixture();
        let mut existing = User::new(PHONE, "hash");
        existing.referral_codes = "A1".to_string();
        f.store.insert_user(&existing).await.unwrap();

        let mut payload = f.signed_payload(42, "ivan");
        payload.referral_code = Some("B2".to_string());
        let temporary = f.accounts.telegram_login(payload).await.unwrap();
        let code = f.code_for(PHONE).await;

        let merged = f
            .accounts
            .complete_registration(temporary.id, request(&code, None))
            .await
            .unwrap();

        assert_eq!(merged.id, existing.id);
        assert_eq!(merged.telegram_id, Some(42));
        assert_eq!(merged.referral_codes, "A1,B2");
        assert!(f.store.find_user(temporary.id).await.unwrap().is_none());
        let by_telegram = f.store.find_user_by_telegram_id(42).await.unwrap().unwrap();
        assert_eq!(by_telegram.id, existing.id);
    }

    #[tokio::test]
    async fn test_completion_with_wrong_code_changes_nothing() {
        let f = fixture();
        let temporary = f
            .accounts
            .telegram_login(f.signed_payload(42, "ivan"))
            .await
            .unwrap();
        let code = f.code_for(PHONE).await;
        let wrong = if code == "0000" { "1111" } else { "0000" };

        let result = f
            .accounts
            .complete_registration(temporary.id, request(wrong, None))
            .await;

        assert!(matches!(result, Err(AccountError::InvalidCode)));
        let stored = f.store.find_user(temporary.id).await.unwrap().unwrap();
        assert_eq!(stored, temporary);
    }

    #[tokio::test]
    async fn test_verified_account_cannot_be_folded_away() {
        let f = fixture();
        let mut admin = User::new("+79990000001", "admin-hash");
        admin.phone_verified = true;
        admin.role = crate::database::Role::Admin;
        f.store.insert_user(&admin).await.unwrap();
        let other = User::new(PHONE, "hash");
        f.store.insert_user(&other).await.unwrap();

        let send = f.accounts.request_completion_code(admin.id, PHONE).await;
        assert!(matches!(send, Err(AccountError::AccessDenied)));

        let code = f.code_for(PHONE).await;
        let result = f
            .accounts
            .complete_registration(admin.id, request(&code, None))
            .await;

        assert!(matches!(result, Err(AccountError::AccessDenied)));
        let stored = f.store.find_user(admin.id).await.unwrap().unwrap();
        assert_eq!(stored, admin);
        assert!(f.store.find_user(other.id).await.unwrap().is_some());
        // refused before the code was spent
        assert!(f.verification.verify(PHONE, &code));
    }

    #[tokio::test]
    async fn test_completed_account_cannot_complete_again() {
        let f = fixture();
        let temporary = f
            .accounts
            .telegram_login(f.signed_payload(42, "ivan"))
            .await
            .unwrap();
        let code = f.code_for(PHONE).await;
        f.accounts
            .complete_registration(temporary.id, request(&code, None))
            .await
            .unwrap();

        let code = f.code_for("+79990000002").await;
        let mut again = request(&code, None);
        again.phone = "+79990000002".to_string();
        let result = f.accounts.complete_registration(temporary.id, again).await;

        assert!(matches!(result, Err(AccountError::AccessDenied)));
    }

    #[tokio::test]
    async fn test_completion_for_missing_account() {
        let f = fixture();
        let result = f
            .accounts
            .complete_registration(Uuid::new_v4(), request("0000", None))
            .await;
        assert!(matches!(result, Err(AccountError::UserNotFound)));
    }
}
