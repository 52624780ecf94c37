use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Database URL cannot be empty")]
    EmptyDatabaseUrl,

    #[error("Record store token cannot be empty")]
    EmptyToken,

    #[error("Record store API URL cannot be empty")]
    EmptyApiUrl,

    #[error("Notifier attempts must be at least 1")]
    ZeroNotifierAttempts,
}

/// Ingest service configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Main listener for incoming webhooks
    pub listener: Listener,
    /// Backing database
    pub database: DatabaseConfig,
    /// Record store (Airtable) API access
    pub record_store: RecordStoreConfig,
    /// Downstream notify webhook behavior
    #[serde(default)]
    pub notifier: NotifierConfig,
    /// Redirect resolution for untracked company-code signal
    #[serde(default)]
    pub redirect: RedirectConfig,
    /// Optional statsd metrics sink
    #[serde(default)]
    pub statsd: Option<StatsdConfig>,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        if self.database.url.is_empty() {
            return Err(ValidationError::EmptyDatabaseUrl);
        }
        if self.record_store.token.is_empty() {
            return Err(ValidationError::EmptyToken);
        }
        if self.record_store.api_url.is_empty() {
            return Err(ValidationError::EmptyApiUrl);
        }
        if self.notifier.attempts == 0 {
            return Err(ValidationError::ZeroNotifierAttempts);
        }
        Ok(())
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    /// sqlite URL, e.g. "sqlite://replyhub.db"
    pub url: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct RecordStoreConfig {
    /// API root, without trailing slash
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Bearer token
    pub token: String,
    /// Retries after the first failed attempt
    #[serde(default = "default_record_store_retries")]
    pub retries: u32,
    /// First backoff delay; doubles per retry
    #[serde(default = "default_backoff_ms")]
    pub backoff_base_ms: u64,
}

fn default_api_url() -> String {
    "https://api.airtable.com/v0".to_string()
}

fn default_record_store_retries() -> u32 {
    5
}

fn default_backoff_ms() -> u64 {
    1000
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct NotifierConfig {
    /// Total attempts, including the first
    #[serde(default = "default_notifier_attempts")]
    pub attempts: u32,
    /// Fixed delay between attempts
    #[serde(default = "default_notifier_delay_ms")]
    pub delay_ms: u64,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            attempts: default_notifier_attempts(),
            delay_ms: default_notifier_delay_ms(),
        }
    }
}

fn default_notifier_attempts() -> u32 {
    3
}

fn default_notifier_delay_ms() -> u64 {
    2000
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct RedirectConfig {
    #[serde(default = "default_redirect_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_redirect_timeout_ms(),
        }
    }
}

fn default_redirect_timeout_ms() -> u64 {
    4000
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct StatsdConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_statsd_prefix")]
    pub prefix: String,
}

fn default_statsd_prefix() -> String {
    "replyhub".to_string()
}
