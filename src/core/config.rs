//! Environment-driven configuration
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.2.0: Add reminder lead/poll tuning knobs
//! - 1.1.0: Add bind address and default timezone
//! - 1.0.0: Initial implementation with WhatsApp and Google credentials

use anyhow::{Context, Result};

/// Runtime configuration, loaded once at startup.
///
/// Secrets come from the environment (a `tokens.env` file is loaded first if
/// present, then `.env`). Missing required variables fail startup; everything
/// else has a sensible default.
#[derive(Debug, Clone)]
pub struct Config {
    /// Token Meta echoes back during webhook subscription verification
    pub verify_token: String,
    /// WhatsApp Cloud API bearer token
    pub meta_access_token: String,
    /// WhatsApp Cloud API phone number id (sender)
    pub phone_number_id: String,
    /// Publicly reachable base URL of this service, used for the OAuth
    /// redirect (`{base_url}/auth/callback`)
    pub base_url: String,
    /// Google OAuth client id
    pub google_client_id: String,
    /// Google OAuth client secret
    pub google_client_secret: String,
    /// SQLite database file path
    pub database_path: String,
    /// Address the webhook server binds to
    pub bind_addr: String,
    /// Timezone assigned to users on first contact
    pub default_timezone: String,
    /// Minutes before an event start at which its reminder fires
    pub reminder_lead_minutes: i64,
    /// Reminder dispatcher polling interval
    pub reminder_poll_seconds: u64,
    /// Default log filter when RUST_LOG is unset
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            verify_token: env_or("VERIFY_TOKEN", "donna_verify"),
            meta_access_token: env_required("META_ACCESS_TOKEN")?,
            phone_number_id: env_required("PHONE_NUMBER_ID")?,
            base_url: env_required("BASE_URL")?.trim_end_matches('/').to_string(),
            google_client_id: env_required("GOOGLE_CLIENT_ID")?,
            google_client_secret: env_required("GOOGLE_CLIENT_SECRET")?,
            database_path: env_or("DATABASE_PATH", "donna.db"),
            bind_addr: env_or("BIND_ADDR", "127.0.0.1:8001"),
            default_timezone: env_or("DEFAULT_TIMEZONE", "America/New_York"),
            reminder_lead_minutes: env_parsed("REMINDER_LEAD_MINUTES", 10)?,
            reminder_poll_seconds: env_parsed("REMINDER_POLL_SECONDS", 30)?,
            log_level: env_or("LOG_LEVEL", "info"),
        })
    }
}

fn env_required(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("{name} must be set"))
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{name} is not a valid number")),
        Err(_) => Ok(default),
    }
}
