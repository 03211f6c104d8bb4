//! SMS provider implementations.

pub mod kavenegar;
pub mod melipayamak;
pub mod mock;
pub mod sms_ir;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

pub use kavenegar::KavenegarProvider;
pub use melipayamak::MelipayamakProvider;
pub use mock::MockSmsProvider;
pub use sms_ir::SmsIrProvider;

/// Default per-request timeout for provider calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsMessage {
    pub to: String,
    pub body: String,
}

/// What a provider returns for an accepted message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderReceipt {
    pub message_id: Option<String>,
    pub cost: Option<f64>,
    pub raw_response: serde_json::Value,
}

#[async_trait]
pub trait SmsProvider: Send + Sync {
    /// Short provider identifier, recorded on every log row.
    fn name(&self) -> &'static str;

    async fn send(&self, sms: &SmsMessage) -> Result<ProviderReceipt, ProviderError>;

    /// Remaining account credit.
    async fn balance(&self) -> Result<f64, ProviderError> {
        Err(ProviderError::Unsupported(
            "Balance check not supported for this provider".to_string(),
        ))
    }
}

/// Supported providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmsProviderKind {
    Kavenegar,
    Melipayamak,
    SmsIr,
    Mock,
}

impl std::fmt::Display for SmsProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Kavenegar => write!(f, "kavenegar"),
            Self::Melipayamak => write!(f, "melipayamak"),
            Self::SmsIr => write!(f, "sms_ir"),
            Self::Mock => write!(f, "mock"),
        }
    }
}

impl std::str::FromStr for SmsProviderKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "kavenegar" => Ok(Self::Kavenegar),
            "melipayamak" => Ok(Self::Melipayamak),
            "sms_ir" | "smsir" => Ok(Self::SmsIr),
            "mock" => Ok(Self::Mock),
            other => Err(ProviderError::Configuration(format!(
                "Unsupported SMS provider: {other}"
            ))),
        }
    }
}

/// Provider credentials and transport settings.
#[derive(Clone)]
pub struct ProviderSettings {
    pub kind: SmsProviderKind,
    pub api_key: String,
    /// Sender line number.
    pub sender: String,
    /// Overrides the provider's public endpoint.
    pub base_url: Option<String>,
    pub timeout: Duration,
}

impl ProviderSettings {
    pub fn new(kind: SmsProviderKind, api_key: impl Into<String>, sender: impl Into<String>) -> Self {
        Self {
            kind,
            api_key: api_key.into(),
            sender: sender.into(),
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn base_url_or(&self, default: &str) -> String {
        self.base_url
            .as_deref()
            .unwrap_or(default)
            .trim_end_matches('/')
            .to_string()
    }

    pub(crate) fn validate(&self) -> Result<(), ProviderError> {
        if self.kind != SmsProviderKind::Mock && self.api_key.is_empty() {
            return Err(ProviderError::Configuration(format!(
                "{} api key is not configured",
                self.kind
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("kind", &self.kind)
            .field("api_key", &"[REDACTED]")
            .field("sender", &self.sender)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

pub(crate) fn http_client(timeout: Duration) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::Configuration(format!("Failed to build HTTP client: {e}")))
}

/// Read a provider body as JSON whatever the HTTP status.
pub(crate) async fn read_json(
    provider: &str,
    response: reqwest::Response,
) -> Result<serde_json::Value, ProviderError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::from_reqwest(provider, e))?;
    serde_json::from_str(&body).map_err(|e| {
        ProviderError::InvalidResponse(format!("{provider} returned status {status}: {e}"))
    })
}

/// Provider ids arrive as numbers or strings.
pub(crate) fn id_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Build the configured provider.
pub fn build_provider(settings: &ProviderSettings) -> Result<Arc<dyn SmsProvider>, ProviderError> {
    settings.validate()?;
    let provider: Arc<dyn SmsProvider> = match settings.kind {
        SmsProviderKind::Kavenegar => Arc::new(KavenegarProvider::new(settings.clone())?),
        SmsProviderKind::Melipayamak => Arc::new(MelipayamakProvider::new(settings.clone())?),
        SmsProviderKind::SmsIr => Arc::new(SmsIrProvider::new(settings.clone())?),
        SmsProviderKind::Mock => Arc::new(MockSmsProvider::new()),
    };
    tracing::info!(provider = provider.name(), "SMS provider configured");
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!("kavenegar".parse::<SmsProviderKind>().unwrap(), SmsProviderKind::Kavenegar);
        assert_eq!("SMS_IR".parse::<SmsProviderKind>().unwrap(), SmsProviderKind::SmsIr);
        assert!("twilio".parse::<SmsProviderKind>().is_err());
        assert_eq!(SmsProviderKind::SmsIr.to_string(), "sms_ir");
    }

    #[test]
    fn test_missing_api_key_rejected() {
        let settings = ProviderSettings::new(SmsProviderKind::Kavenegar, "", "1000");
        assert!(matches!(
            build_provider(&settings),
            Err(ProviderError::Configuration(_))
        ));
        let mock = ProviderSettings::new(SmsProviderKind::Mock, "", "");
        assert_eq!(build_provider(&mock).unwrap().name(), "mock");
    }

    #[test]
    fn test_settings_debug_redacts_key() {
        let settings = ProviderSettings::new(SmsProviderKind::Kavenegar, "top-secret-key", "1000");
        assert!(!format!("{settings:?}").contains("top-secret-key"));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let settings = ProviderSettings::new(SmsProviderKind::Kavenegar, "k", "1")
            .with_base_url("http://localhost:9000/");
        assert_eq!(settings.base_url_or("https://x"), "http://localhost:9000");
    }

    #[test]
    fn test_id_string() {
        assert_eq!(id_string(&serde_json::json!(123)), Some("123".to_string()));
        assert_eq!(id_string(&serde_json::json!("abc")), Some("abc".to_string()));
        assert_eq!(id_string(&serde_json::Value::Null), None);
    }
}
