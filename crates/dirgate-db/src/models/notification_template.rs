//! SMS message templates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteExecutor};

/// Handlebars message template.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct NotificationTemplate {
    pub id: i64,
    pub name: String,
    /// Body with `{{username}}`, `{{password}}`, `{{full_name}}` placeholders.
    pub body: String,
    /// Placeholder names in display order.
    pub variables: sqlx::types::Json<Vec<String>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewNotificationTemplate {
    pub name: String,
    pub body: String,
    pub variables: Vec<String>,
    pub is_active: Option<bool>,
}

impl NotificationTemplate {
    /// Create or replace a template by name.
    pub async fn upsert<'e, E>(executor: E, data: &NewNotificationTemplate) -> Result<Self, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let now = Utc::now();
        sqlx::query_as(
            r#"
            INSERT INTO notification_templates (name, body, variables, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (name) DO UPDATE SET
                body = excluded.body,
                variables = excluded.variables,
                is_active = excluded.is_active,
                updated_at = excluded.updated_at
            RETURNING *
            "#,
        )
        .bind(&data.name)
        .bind(&data.body)
        .bind(sqlx::types::Json(&data.variables))
        .bind(data.is_active.unwrap_or(true))
        .bind(now)
        .bind(now)
        .fetch_one(executor)
        .await
    }

    /// The most recently updated active template.
    pub async fn find_active<'e, E>(executor: E) -> Result<Option<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as(
            r#"
            SELECT * FROM notification_templates
            WHERE is_active = 1
            ORDER BY updated_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(executor)
        .await
    }

    pub async fn find_by_name<'e, E>(executor: E, name: &str) -> Result<Option<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as("SELECT * FROM notification_templates WHERE name = ?")
            .bind(name)
            .fetch_optional(executor)
            .await
    }

    pub async fn set_active<'e, E>(executor: E, id: i64, active: bool) -> Result<bool, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query(
            "UPDATE notification_templates SET is_active = ?, updated_at = ? WHERE id = ?",
        )
        .bind(active)
        .bind(Utc::now())
        .bind(id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
