//! Configuration loaded from environment variables.
//!
//! Values come from the process environment (after `.env` is loaded). Malformed
//! values fail fast with a [`ConfigError`]; missing optional values fall back
//! to defaults. An active directory server profile stored in the database
//! overrides the `DIRECTORY_*` connection values.

use std::env;
use std::time::Duration;

use thiserror::Error;

use dirgate_db::models::DirectoryServerConfig;
use dirgate_directory::{DirectoryBackend, DirectorySettings};
use dirgate_notify::{ProviderSettings, SmsProviderKind};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://dirgate.db?mode=rwc";
pub const DEFAULT_LOG_FILTER: &str = "info";
pub const DEFAULT_SECRET_EXPIRY_DAYS: i64 = 7;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },
}

/// Runtime configuration for the CLI.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub log_filter: String,
    pub directory: DirectorySettings,
    /// `None` when `SMS_PROVIDER` is unset; delivery is then skipped.
    pub sms: Option<ProviderSettings>,
    pub secret_expiry_days: i64,
}

impl Config {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load using `get` to resolve variable names.
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let backend = match var("DIRECTORY_BACKEND") {
            Some(value) => value.parse::<DirectoryBackend>().map_err(|message| {
                ConfigError::InvalidValue {
                    var: "DIRECTORY_BACKEND".to_string(),
                    message,
                }
            })?,
            None => DirectoryBackend::default(),
        };

        let mut directory = DirectorySettings::new(
            var("DIRECTORY_HOST").unwrap_or_default(),
            var("DIRECTORY_BASE_DN").unwrap_or_default(),
            var("DIRECTORY_BIND_DN").unwrap_or_default(),
        )
        .with_backend(backend);
        if parse_bool("DIRECTORY_USE_SSL", var("DIRECTORY_USE_SSL"))? {
            directory = directory.with_ssl();
        }
        if let Some(port) = var("DIRECTORY_PORT") {
            directory = directory.with_port(parse_number("DIRECTORY_PORT", &port)?);
        }
        if let Some(password) = var("DIRECTORY_BIND_PASSWORD") {
            directory = directory.with_password(password);
        }
        if let Some(timeout) = var("DIRECTORY_TIMEOUT_SECS") {
            directory.timeout_secs = parse_positive("DIRECTORY_TIMEOUT_SECS", &timeout)?;
        }

        let sms = match var("SMS_PROVIDER") {
            Some(name) => {
                let kind = name
                    .parse::<SmsProviderKind>()
                    .map_err(|e| ConfigError::InvalidValue {
                        var: "SMS_PROVIDER".to_string(),
                        message: e.to_string(),
                    })?;
                let api_key = match kind {
                    SmsProviderKind::Mock => var("SMS_API_KEY").unwrap_or_default(),
                    _ => var("SMS_API_KEY")
                        .ok_or_else(|| ConfigError::MissingVar("SMS_API_KEY".to_string()))?,
                };
                let mut settings =
                    ProviderSettings::new(kind, api_key, var("SMS_SENDER").unwrap_or_default());
                if let Some(url) = var("SMS_BASE_URL") {
                    settings = settings.with_base_url(url);
                }
                if let Some(timeout) = var("SMS_TIMEOUT_SECS") {
                    let secs: u64 = parse_positive("SMS_TIMEOUT_SECS", &timeout)?;
                    settings = settings.with_timeout(Duration::from_secs(secs));
                }
                Some(settings)
            }
            None => None,
        };

        let secret_expiry_days = match var("SECRET_EXPIRY_DAYS") {
            Some(days) => parse_positive("SECRET_EXPIRY_DAYS", &days)?,
            None => DEFAULT_SECRET_EXPIRY_DAYS,
        };

        Ok(Self {
            database_url: var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            log_filter: var("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
            directory,
            sms,
            secret_expiry_days,
        })
    }

    /// Replace the directory connection values with a stored profile.
    pub fn apply_server_config(&mut self, profile: &DirectoryServerConfig) -> Result<(), ConfigError> {
        let port = u16::try_from(profile.port).map_err(|_| ConfigError::InvalidValue {
            var: format!("directory_server_configs[{}].port", profile.id),
            message: format!("{} is not a valid port", profile.port),
        })?;

        let directory = &mut self.directory;
        directory.host = profile.host.clone();
        directory.port = port;
        directory.use_ssl = profile.use_ssl;
        directory.base_dn = profile.base_dn.clone();
        directory.bind_dn = profile.bind_dn.clone();
        if profile.bind_password.is_some() {
            directory.bind_password = profile.bind_password.clone();
        }
        Ok(())
    }
}

fn parse_number<T>(var: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        var: var.to_string(),
        message: e.to_string(),
    })
}

fn parse_positive<T>(var: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
    T::Err: std::fmt::Display,
{
    let parsed: T = parse_number(var, value)?;
    if parsed <= T::default() {
        return Err(ConfigError::InvalidValue {
            var: var.to_string(),
            message: "must be greater than zero".to_string(),
        });
    }
    Ok(parsed)
}

fn parse_bool(var: &str, value: Option<String>) -> Result<bool, ConfigError> {
    match value.as_deref().map(str::to_lowercase).as_deref() {
        None => Ok(false),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(ConfigError::InvalidValue {
            var: var.to_string(),
            message: format!("expected a boolean, got '{other}'"),
        }),
    }
}
