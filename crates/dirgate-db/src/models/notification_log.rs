//! Append-only SMS delivery audit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteExecutor};

/// Outcome of one dispatch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Sent,
    Failed,
}

impl NotificationStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct NotificationLog {
    pub id: i64,
    pub recipient: String,
    /// Rendered message with any secret masked.
    pub message: String,
    pub template_id: Option<i64>,
    pub provider: String,
    pub status: String,
    pub message_id: Option<String>,
    pub error: Option<String>,
    pub cost: Option<f64>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotificationLog {
    pub recipient: String,
    pub message: String,
    pub template_id: Option<i64>,
    pub provider: String,
    pub status: NotificationStatus,
    pub message_id: Option<String>,
    pub error: Option<String>,
    pub cost: Option<f64>,
}

impl NotificationLog {
    pub async fn insert<'e, E>(executor: E, data: &NewNotificationLog) -> Result<Self, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let now = Utc::now();
        let sent_at = (data.status == NotificationStatus::Sent).then_some(now);
        sqlx::query_as(
            r#"
            INSERT INTO notification_logs (
                recipient, message, template_id, provider, status,
                message_id, error, cost, sent_at, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&data.recipient)
        .bind(&data.message)
        .bind(data.template_id)
        .bind(&data.provider)
        .bind(data.status.as_str())
        .bind(&data.message_id)
        .bind(&data.error)
        .bind(data.cost)
        .bind(sent_at)
        .bind(now)
        .fetch_one(executor)
        .await
    }

    /// Newest first.
    pub async fn list_recent<'e, E>(executor: E, limit: i64) -> Result<Vec<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as("SELECT * FROM notification_logs ORDER BY id DESC LIMIT ?")
            .bind(limit)
            .fetch_all(executor)
            .await
    }

    pub async fn list_for_recipient<'e, E>(
        executor: E,
        recipient: &str,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as("SELECT * FROM notification_logs WHERE recipient = ? ORDER BY id DESC")
            .bind(recipient)
            .fetch_all(executor)
            .await
    }

    pub async fn count_by_status<'e, E>(
        executor: E,
        status: NotificationStatus,
    ) -> Result<i64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_scalar("SELECT COUNT(*) FROM notification_logs WHERE status = ?")
            .bind(status.as_str())
            .fetch_one(executor)
            .await
    }
}
