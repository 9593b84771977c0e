use crate::database::{Role, User};
use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Password hashing failed: {0}")]
    HashingError(String),
    #[error("Token creation failed: {0}")]
    TokenError(String),
    #[error("Invalid or expired session token")]
    InvalidToken,
}

pub fn hash_password(plain: &str) -> Result<String, AuthError> {
    let mut salt_bytes = [0u8; 16];
    rand::rng().fill(&mut salt_bytes);
    let salt =
        SaltString::encode_b64(&salt_bytes).map_err(|e| AuthError::HashingError(e.to_string()))?;

    Ok(Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| AuthError::HashingError(e.to_string()))?
        .to_string())
}

/// False for a wrong password and for a hash that cannot be parsed.
pub fn verify_password(hash: &str, plain: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok()
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    pub sub: Uuid,
    pub phone: String,
    pub role: Role,
    /// Set for Telegram-only accounts that still have a placeholder phone.
    #[serde(default)]
    pub needs_phone: bool,
    pub exp: i64,
    pub iat: i64,
}

/// Issues and checks the HS256 bearer tokens handed out after login.
#[derive(Clone)]
pub struct SessionTokens {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl SessionTokens {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Accounts without a verified phone get `needs_phone` set.
    pub fn issue(&self, user: &User) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id,
            phone: user.phone.clone(),
            role: user.role,
            needs_phone: !user.phone_verified,
            exp: (now + self.ttl).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenError(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_roundtrip() {
        let hash = hash_password("secret-1").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "secret-1"));
        assert!(!verify_password(&hash, "secret-2"));
    }

    #[test]
    fn test_garbage_hash_never_verifies() {
        assert!(!verify_password("", "anything"));
        assert!(!verify_password("plain-text", "plain-text"));
    }

    #[test]
    fn test_issue_and_verify_token() {
        let tokens = SessionTokens::new("test_secret", Duration::hours(1));
        let user = User::new("+79991234567", "hash");

        let token = tokens.issue(&user).unwrap();
        let claims = tokens.verify(&token).unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.phone, "+79991234567");
        assert_eq!(claims.role, Role::User);
        assert!(claims.needs_phone);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let issuer = SessionTokens::new("secret1", Duration::hours(1));
        let other = SessionTokens::new("secret2", Duration::hours(1));
        let token = issuer
            .issue(&User::new("+79991234567", "hash"))
            .unwrap();

        assert!(matches!(other.verify(&token), Err(AuthError::InvalidToken)));
        assert!(matches!(issuer.verify("not-a-token"), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        // beyond jsonwebtoken's default 60s leeway
        let tokens = SessionTokens::new("test_secret", Duration::minutes(-5));
        let token = tokens
            .issue(&User::new("+79991234567", "hash"))
            .unwrap();

        assert!(matches!(tokens.verify(&token), Err(AuthError::InvalidToken)));
    }
}
