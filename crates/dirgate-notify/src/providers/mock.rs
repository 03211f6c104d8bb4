//! In-process provider for development and tests.

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{ProviderReceipt, SmsMessage, SmsProvider};
use crate::error::ProviderError;

/// Records every message; can be told to fail.
#[derive(Debug, Default)]
pub struct MockSmsProvider {
    sent: Mutex<Vec<SmsMessage>>,
    failure: Mutex<Option<String>>,
}

impl MockSmsProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent sends fail with `message`; `None` restores success.
    pub async fn fail_with(&self, message: Option<&str>) {
        *self.failure.lock().await = message.map(str::to_string);
    }

    pub async fn sent(&self) -> Vec<SmsMessage> {
        self.sent.lock().await.clone()
    }

    pub async fn send_count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

#[async_trait]
impl SmsProvider for MockSmsProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn send(&self, sms: &SmsMessage) -> Result<ProviderReceipt, ProviderError> {
        if let Some(message) = self.failure.lock().await.clone() {
            return Err(ProviderError::Rejected {
                message,
                response: serde_json::json!({ "mock": true, "success": false }),
            });
        }

        let mut sent = self.sent.lock().await;
        sent.push(sms.clone());
        let id = format!("mock-{}", sent.len());
        tracing::debug!(to = %sms.to, id = %id, "Mock SMS recorded");

        Ok(ProviderReceipt {
            message_id: Some(id.clone()),
            cost: Some(0.0),
            raw_response: serde_json::json!({ "mock": true, "id": id }),
        })
    }

    async fn balance(&self) -> Result<f64, ProviderError> {
        Ok(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sms() -> SmsMessage {
        SmsMessage {
            to: "09120000000".to_string(),
            body: "hello".to_string(),
        }
    }

    #[tokio::test]
    async fn test_mock_records_sends() {
        let provider = MockSmsProvider::new();
        let receipt = provider.send(&sms()).await.unwrap();
        assert_eq!(receipt.message_id.as_deref(), Some("mock-1"));
        assert_eq!(provider.sent().await, vec![sms()]);
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let provider = MockSmsProvider::new();
        provider.fail_with(Some("line blocked")).await;
        let err = provider.send(&sms()).await.unwrap_err();
        assert_eq!(err.to_string(), "line blocked");
        assert_eq!(provider.send_count().await, 0);

        provider.fail_with(None).await;
        assert!(provider.send(&sms()).await.is_ok());
    }
}
