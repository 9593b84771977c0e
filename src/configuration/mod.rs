use crate::accounts::AccountService;
use crate::auth::SessionTokens;
use crate::core::clock::{Clock, SystemClock};
use crate::database::{MemoryStore, PostgrestStore, Store};
use crate::telegram::{TelegramValidator, DEFAULT_AUTH_MAX_AGE_SECS};
use crate::verification::delivery::sms::SmsSender;
use crate::verification::delivery::voice::VoiceCallSender;
use crate::verification::{Channel, CodeSender, MemoryOtpStore, VerificationService};
use crate::web::{AppState, TelegramLink};
use serde::Deserialize;
use std::env;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("File read error")]
    FileError,

    #[error("Deserialization error:{0}")]
    DeserializationError(String),

    #[error("Missing environment variable {0}")]
    MissingSecret(&'static str),

    #[error("Invalid configuration:{0}")]
    InvalidValue(String),
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub verification: VerificationConfig,
    pub sms: SmsConfig,
    pub voice: VoiceConfig,
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    #[default]
    Postgrest,
    Memory,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub backend: DatabaseBackend,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VerificationConfig {
    pub channel: Channel,
    #[serde(default = "default_code_length")]
    pub code_length: usize,
    #[serde(default = "default_code_ttl_secs")]
    pub code_ttl_secs: i64,
    /// 0 turns the background sweep off.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SmsConfig {
    pub api_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VoiceConfig {
    pub api_url: String,
    pub virtual_number: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub bot_id: String,
    pub bot_username: String,
    pub redirect_uri: String,
    #[serde(default = "default_auth_max_age_secs")]
    pub auth_max_age_secs: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_ttl_hours: default_token_ttl_hours(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_code_length() -> usize {
    4
}

fn default_code_ttl_secs() -> i64 {
    300
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_auth_max_age_secs() -> i64 {
    DEFAULT_AUTH_MAX_AGE_SECS
}

fn default_token_ttl_hours() -> i64 {
    24
}

impl Config {
    pub fn new(config_file: &str) -> Result<Self, ConfigError> {
        let config_str = fs::read_to_string(config_file).map_err(|_| ConfigError::FileError)?;
        Self::from_json(&config_str)
    }

    pub fn from_json(config_str: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(config_str)
            .map_err(|e| ConfigError::DeserializationError(e.to_string()))?;
        Ok(config)
    }
}

/// Credentials read from the environment. Only the ones the configured
/// channel and backend need are required.
#[derive(Clone, Default)]
pub struct Secrets {
    pub smsc_login: String,
    pub smsc_password: String,
    pub novofon_api_secret: String,
    pub telegram_bot_token: String,
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_key: String,
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or(ConfigError::MissingSecret(name))
}

fn optional(name: &str) -> String {
    env::var(name).unwrap_or_default()
}

impl Secrets {
    pub fn from_env(config: &Config) -> Result<Self, ConfigError> {
        let (smsc_login, smsc_password, novofon_api_secret) = match config.verification.channel {
            Channel::Sms => (
                required("SMSC_LOGIN")?,
                required("SMSC_PASSWORD")?,
                optional("NOVOFON_API_SECRET"),
            ),
            Channel::Voice => (
                optional("SMSC_LOGIN"),
                optional("SMSC_PASSWORD"),
                required("NOVOFON_API_SECRET")?,
            ),
        };
        let (supabase_url, supabase_key) = match config.database.backend {
            DatabaseBackend::Postgrest => (required("SUPABASE_URL")?, required("SUPABASE_KEY")?),
            DatabaseBackend::Memory => (optional("SUPABASE_URL"), optional("SUPABASE_KEY")),
        };

        Ok(Self {
            smsc_login,
            smsc_password,
            novofon_api_secret,
            telegram_bot_token: required("TELEGRAM_BOT_TOKEN")?,
            jwt_secret: required("JWT_SECRET")?,
            supabase_url,
            supabase_key,
        })
    }
}

/// Everything the services share, built once at startup.
#[derive(Clone)]
pub struct Context {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub verification: Arc<VerificationService>,
    pub accounts: Arc<AccountService>,
    pub tokens: SessionTokens,
}

impl Context {
    pub fn new(config_file: &str) -> Result<Self, ConfigError> {
        let config = Config::new(config_file)?;
        let secrets = Secrets::from_env(&config)?;
        Self::build(config, &secrets)
    }

    pub fn build(config: Config, secrets: &Secrets) -> Result<Self, ConfigError> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let store: Arc<dyn Store> = match config.database.backend {
            DatabaseBackend::Postgrest => Arc::new(PostgrestStore::new(
                &secrets.supabase_url,
                &secrets.supabase_key,
            )),
            DatabaseBackend::Memory => Arc::new(MemoryStore::new()),
        };

        let verification = Arc::new(
            VerificationService::new(
                code_sender(&config, secrets)?,
                Arc::new(MemoryOtpStore::new(chrono::Duration::seconds(
                    config.verification.code_ttl_secs,
                ))),
                clock.clone(),
                config.verification.code_length,
            )
            .map_err(|e| ConfigError::InvalidValue(e.to_string()))?,
        );

        let validator = TelegramValidator::new(&secrets.telegram_bot_token)
            .with_max_age(config.telegram.auth_max_age_secs);
        let accounts = Arc::new(AccountService::new(
            store.clone(),
            verification.clone(),
            validator,
            clock,
        ));
        let tokens = SessionTokens::new(
            &secrets.jwt_secret,
            chrono::Duration::hours(config.session.token_ttl_hours),
        );

        Ok(Self {
            config,
            store,
            verification,
            accounts,
            tokens,
        })
    }

    pub fn app_state(&self) -> AppState {
        AppState {
            accounts: self.accounts.clone(),
            tokens: self.tokens.clone(),
            telegram: TelegramLink {
                bot_id: self.config.telegram.bot_id.clone(),
                bot_username: self.config.telegram.bot_username.clone(),
                origin: self.config.server.base_url.clone(),
                redirect_uri: self.config.telegram.redirect_uri.clone(),
            },
        }
    }
}

fn code_sender(config: &Config, secrets: &Secrets) -> Result<Arc<dyn CodeSender>, ConfigError> {
    let timeout = Duration::from_secs(config.verification.request_timeout_secs);
    let sender: Arc<dyn CodeSender> = match config.verification.channel {
        Channel::Sms => Arc::new(
            SmsSender::new(
                &config.sms.api_url,
                &secrets.smsc_login,
                &secrets.smsc_password,
                timeout,
            )
            .map_err(|e| ConfigError::InvalidValue(e.to_string()))?,
        ),
        Channel::Voice => Arc::new(
            VoiceCallSender::new(
                &config.voice.api_url,
                &secrets.novofon_api_secret,
                &config.voice.virtual_number,
                timeout,
            )
            .map_err(|e| ConfigError::InvalidValue(e.to_string()))?,
        ),
    };
    Ok(sender)
}
