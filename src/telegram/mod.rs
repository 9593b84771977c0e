use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Deserializer};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_AUTH_MAX_AGE_SECS: i64 = 86_400;

/// Data returned by the Telegram Login Widget.
///
/// The widget delivers it either as query parameters on the redirect or as a
/// JSON object from the popup callback, so numeric fields accept both
/// numbers and strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelegramAuthPayload {
    #[serde(default, deserialize_with = "number_or_string")]
    pub id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub photo_url: Option<String>,
    #[serde(default, deserialize_with = "number_or_string")]
    pub auth_date: Option<String>,
    pub hash: Option<String>,
    /// Added by our front end, not signed by Telegram.
    #[serde(default, alias = "referralLink")]
    pub referral_code: Option<String>,
}

impl TelegramAuthPayload {
    pub fn telegram_id(&self) -> Option<i64> {
        self.id.as_deref().and_then(|id| id.parse().ok())
    }

    /// Builds the string Telegram signs: every received field except the hash,
    /// sorted by key, as `key=value` lines.
    pub fn data_check_string(&self) -> String {
        let mut fields = BTreeMap::new();
        let candidates = [
            ("id", &self.id),
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("username", &self.username),
            ("photo_url", &self.photo_url),
            ("auth_date", &self.auth_date),
        ];
        for (key, value) in candidates {
            if let Some(value) = value {
                fields.insert(key, value.as_str());
            }
        }

        fields
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(i64),
    Text(String),
}

fn number_or_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<NumberOrString>::deserialize(deserializer)?.map(|value| match value {
            NumberOrString::Number(n) => n.to_string(),
            NumberOrString::Text(s) => s,
        }),
    )
}

/// Checks Login Widget payloads against the bot token.
#[derive(Clone)]
pub struct TelegramValidator {
    secret_key: [u8; 32],
    max_age_secs: i64,
}

impl TelegramValidator {
    pub fn new(bot_token: &str) -> Self {
        Self {
            secret_key: Sha256::digest(bot_token.as_bytes()).into(),
            max_age_secs: DEFAULT_AUTH_MAX_AGE_SECS,
        }
    }

    pub fn with_max_age(mut self, max_age_secs: i64) -> Self {
        self.max_age_secs = max_age_secs;
        self
    }

    /// Hex HMAC-SHA256 of `data` keyed with SHA-256 of the bot token.
    pub fn sign(&self, data: &str) -> String {
        let mut mac = match HmacSha256::new_from_slice(&self.secret_key) {
            Ok(mac) => mac,
            Err(_) => return String::new(),
        };
        mac.update(data.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    pub fn validate(&self, payload: &TelegramAuthPayload, now: DateTime<Utc>) -> bool {
        let (Some(_), Some(auth_date), Some(hash)) =
            (&payload.id, &payload.auth_date, &payload.hash)
        else {
            warn!("Telegram payload is missing required fields");
            return false;
        };

        let auth_date: i64 = match auth_date.parse() {
            Ok(ts) => ts,
            Err(_) => {
                warn!(auth_date, "Telegram auth_date is not a timestamp");
                return false;
            }
        };

        if now.timestamp() - auth_date > self.max_age_secs {
            warn!(auth_date, "Telegram authorization data is stale");
            return false;
        }

        // hex::decode accepts either case
        let expected = match hex::decode(hash) {
            Ok(bytes) => bytes,
            Err(_) => {
                warn!("Telegram hash is not valid hex");
                return false;
            }
        };

        let mut mac = match HmacSha256::new_from_slice(&self.secret_key) {
            Ok(mac) => mac,
            Err(_) => return false,
        };
        mac.update(payload.data_check_string().as_bytes());

        let valid = mac.verify_slice(&expected).is_ok();
        if !valid {
            warn!(telegram_id = ?payload.id, "Telegram hash mismatch");
        }
        valid
    }
}

/// URL that starts the Telegram OAuth flow for linking an account.
pub fn login_url(bot_id: &str, origin: &str, return_to: &str) -> String {
    format!(
        "https://oauth.telegram.org/auth?bot_id={}&origin={}&request_access=write&return_to={}",
        urlencoding::encode(bot_id),
        urlencoding::encode(origin),
        urlencoding::encode(return_to)
    )
}
