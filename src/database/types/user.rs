use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "USER"),
            Role::Admin => write!(f, "ADMIN"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub phone: String,
    pub password_hash: String,
    pub telegram_id: Option<i64>,
    pub telegram_username: Option<String>,
    pub phone_verified: bool,
    pub role: Role,
    /// Comma-joined referral/QR codes the user has redeemed.
    pub referral_codes: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(phone: &str, password_hash: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            phone: phone.to_string(),
            password_hash: password_hash.to_string(),
            telegram_id: None,
            telegram_username: None,
            phone_verified: false,
            role: Role::User,
            referral_codes: String::new(),
            created_at: Utc::now(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Created from Telegram and still waiting for a verified phone.
    pub fn is_temporary(&self) -> bool {
        !self.phone_verified && self.telegram_id.is_some()
    }
}

// What the API hands back about a user; never the password hash
#[derive(Debug, Serialize, Clone)]
pub struct UserProfile {
    pub id: Uuid,
    pub phone: String,
    pub telegram_id: Option<i64>,
    pub telegram_username: Option<String>,
    pub phone_verified: bool,
    pub role: Role,
    pub referral_codes: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            phone: user.phone.clone(),
            telegram_id: user.telegram_id,
            telegram_username: user.telegram_username.clone(),
            phone_verified: user.phone_verified,
            role: user.role,
            referral_codes: crate::access::parse_codes(&user.referral_codes),
            created_at: user.created_at,
        }
    }
}
