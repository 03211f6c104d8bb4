//! Delivery of issued secrets with an audit row per attempt.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use dirgate_db::models::{NewNotificationLog, NotificationLog, NotificationStatus, NotificationTemplate};
use dirgate_db::DbPool;
use dirgate_secrets::SecretValue;

use crate::error::{NotificationError, ProviderError};
use crate::providers::{ProviderReceipt, SmsMessage, SmsProvider};
use crate::template::{render_masked, render_template, MessageVars};

/// Provider-independent result of one send.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliveryReport {
    pub success: bool,
    pub message_id: Option<String>,
    pub cost: Option<f64>,
    pub error: Option<String>,
    pub raw_response: Option<serde_json::Value>,
}

impl DeliveryReport {
    fn from_result(result: Result<ProviderReceipt, ProviderError>) -> Self {
        match result {
            Ok(receipt) => Self {
                success: true,
                message_id: receipt.message_id,
                cost: receipt.cost,
                error: None,
                raw_response: Some(receipt.raw_response),
            },
            Err(e) => Self::failed(&e),
        }
    }

    fn failed(e: &ProviderError) -> Self {
        Self {
            success: false,
            error: Some(e.to_string()),
            raw_response: e.raw_response().cloned(),
            ..Default::default()
        }
    }
}

/// A secret to deliver.
#[derive(Debug, Clone)]
pub struct SecretNotice<'a> {
    pub recipient: &'a str,
    pub username: &'a str,
    pub full_name: &'a str,
    pub secret: &'a SecretValue,
}

/// A send attempt and its audit row.
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub report: DeliveryReport,
    pub log: NotificationLog,
}

pub struct NotificationDispatcher {
    provider: Arc<dyn SmsProvider>,
    db: DbPool,
}

impl NotificationDispatcher {
    pub fn new(provider: Arc<dyn SmsProvider>, db: DbPool) -> Self {
        Self { provider, db }
    }

    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Send a raw message and append a NotificationLog row for the attempt.
    ///
    /// Provider failures, transport errors and timeouts come back as
    /// `success = false`; only a failure to write the audit row is an error.
    #[instrument(skip(self, message), fields(provider = self.provider.name()))]
    pub async fn send(&self, recipient: &str, message: &str) -> Result<Dispatch, NotificationError> {
        let report = self.dispatch(recipient, message).await;
        self.record(recipient, message.to_string(), None, report).await
    }

    /// Render the active template for `notice`, send it, and append a
    /// NotificationLog row with the secret masked.
    ///
    /// Delivery failures are reported in the returned [`DeliveryReport`];
    /// only a failure to write the audit row is an error.
    #[instrument(skip(self, notice), fields(provider = self.provider.name(), username = notice.username))]
    pub async fn send_secret(&self, notice: &SecretNotice<'_>) -> Result<Dispatch, NotificationError> {
        let template = NotificationTemplate::find_active(self.db.inner()).await?;
        let body = template.as_ref().map(|t| t.body.as_str());
        let vars = MessageVars {
            username: notice.username,
            full_name: notice.full_name,
            password: notice.secret,
        };

        let (report, logged_message) = match render_template(body, &vars) {
            Ok(message) => {
                let masked = render_masked(body, &vars)?;
                (self.dispatch(notice.recipient, &message).await, masked)
            }
            Err(e) => {
                warn!(error = %e, "Message template could not be rendered");
                let report = DeliveryReport {
                    success: false,
                    error: Some(e.to_string()),
                    ..Default::default()
                };
                (report, body.unwrap_or_default().to_string())
            }
        };

        self.record(
            notice.recipient,
            logged_message,
            template.as_ref().map(|t| t.id),
            report,
        )
        .await
    }

    async fn dispatch(&self, recipient: &str, message: &str) -> DeliveryReport {
        let to = recipient.trim();
        if to.is_empty() {
            return DeliveryReport::failed(&ProviderError::InvalidRecipient(
                "Phone number is empty".to_string(),
            ));
        }

        let sms = SmsMessage {
            to: to.to_string(),
            body: message.to_string(),
        };
        let report = DeliveryReport::from_result(self.provider.send(&sms).await);
        if let Some(error) = &report.error {
            warn!(recipient = %to, error = %error, "SMS delivery failed");
        }
        report
    }

    async fn record(
        &self,
        recipient: &str,
        logged_message: String,
        template_id: Option<i64>,
        report: DeliveryReport,
    ) -> Result<Dispatch, NotificationError> {
        let status = if report.success {
            NotificationStatus::Sent
        } else {
            NotificationStatus::Failed
        };
        let log = NotificationLog::insert(
            self.db.inner(),
            &NewNotificationLog {
                recipient: recipient.trim().to_string(),
                message: logged_message,
                template_id,
                provider: self.provider.name().to_string(),
                status,
                message_id: report.message_id.clone(),
                error: report.error.clone(),
                cost: report.cost,
            },
        )
        .await?;

        info!(status = %status, log_id = log.id, "Notification recorded");
        Ok(Dispatch { report, log })
    }

    /// Remaining provider credit.
    pub async fn balance(&self) -> Result<f64, ProviderError> {
        self.provider.balance().await
    }
}
