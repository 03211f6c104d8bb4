//! Successful lifecycle results.

use chrono::{DateTime, Utc};
use serde::Serialize;

use dirgate_secrets::SecretValue;

/// Tagged success: a user-facing message plus the operation's value.
#[derive(Debug, Clone)]
pub struct LifecycleOutcome<T> {
    pub message: String,
    pub value: T,
}

impl<T> LifecycleOutcome<T> {
    pub fn new(message: impl Into<String>, value: T) -> Self {
        Self {
            message: message.into(),
            value,
        }
    }
}

/// What happened to the SMS carrying a secret.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// The caller did not ask for delivery.
    NotRequested,
    /// Delivery was requested but could not be attempted.
    Skipped { reason: String },
    Sent {
        message_id: Option<String>,
        log_id: Option<i64>,
    },
    Failed {
        error: String,
        log_id: Option<i64>,
    },
}

impl DeliveryOutcome {
    #[must_use]
    pub fn is_sent(&self) -> bool {
        matches!(self, DeliveryOutcome::Sent { .. })
    }

    pub(crate) fn summary(&self) -> String {
        match self {
            DeliveryOutcome::NotRequested => String::new(),
            DeliveryOutcome::Skipped { reason } => format!("; SMS not sent: {reason}"),
            DeliveryOutcome::Sent { .. } => "; SMS sent".to_string(),
            DeliveryOutcome::Failed { error, .. } => format!("; SMS delivery failed: {error}"),
        }
    }
}

/// Result of provisioning. The secret is only ever returned here and by
/// [`PasswordChanged`].
#[derive(Debug, Clone)]
pub struct CreatedUser {
    pub uid: String,
    pub secret: SecretValue,
    pub issued_secret_id: i64,
    /// Groups the user could not be added to. The user and secret are kept.
    pub group_failures: Vec<GroupFailure>,
    pub delivery: DeliveryOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupFailure {
    pub group: String,
    pub error: String,
}

#[derive(Debug, Clone)]
pub struct PasswordChanged {
    pub uid: String,
    pub secret: SecretValue,
    pub issued_secret_id: i64,
    pub delivery: DeliveryOutcome,
}

/// Counts from a directory-to-mirror reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub seen: usize,
    pub created: usize,
    pub updated: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GroupSyncSummary {
    pub groups: usize,
    pub memberships: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionTest {
    pub backend: String,
    pub base_dn: String,
    /// Id of the active server profile the result was recorded on.
    pub recorded_on: Option<i64>,
}

/// New `krbPrincipalExpiration`, `None` when cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PrincipalExpiration {
    pub expires_at: Option<DateTime<Utc>>,
}
