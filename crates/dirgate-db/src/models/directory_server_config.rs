//! Directory server connection profile.
//!
//! At most one profile is active; the active one supplies the connection
//! values for every directory operation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteExecutor, SqlitePool};

/// Stored directory connection profile.
#[derive(Clone, FromRow, Serialize, Deserialize)]
pub struct DirectoryServerConfig {
    pub id: i64,
    pub name: String,
    pub host: String,
    pub port: i64,
    pub use_ssl: bool,
    pub base_dn: String,
    pub bind_dn: String,
    #[serde(skip_serializing)]
    pub bind_password: Option<String>,
    pub is_active: bool,
    /// Outcome of the last connection test, if one ran.
    pub last_test_ok: Option<bool>,
    pub last_test_message: Option<String>,
    pub last_tested_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for DirectoryServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryServerConfig")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("use_ssl", &self.use_ssl)
            .field("base_dn", &self.base_dn)
            .field("bind_dn", &self.bind_dn)
            .field("bind_password", &"[REDACTED]")
            .field("is_active", &self.is_active)
            .field("last_test_ok", &self.last_test_ok)
            .finish_non_exhaustive()
    }
}

/// Data for creating a profile.
#[derive(Clone, Deserialize)]
pub struct NewDirectoryServerConfig {
    pub name: String,
    pub host: String,
    pub port: i64,
    pub use_ssl: bool,
    pub base_dn: String,
    pub bind_dn: String,
    pub bind_password: Option<String>,
}

impl std::fmt::Debug for NewDirectoryServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewDirectoryServerConfig")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("use_ssl", &self.use_ssl)
            .field("base_dn", &self.base_dn)
            .field("bind_dn", &self.bind_dn)
            .field("bind_password", &"[REDACTED]")
            .finish()
    }
}

impl DirectoryServerConfig {
    /// Insert an inactive profile.
    pub async fn create<'e, E>(
        executor: E,
        data: &NewDirectoryServerConfig,
    ) -> Result<Self, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let now = Utc::now();
        sqlx::query_as(
            r#"
            INSERT INTO directory_server_configs (
                name, host, port, use_ssl, base_dn, bind_dn, bind_password,
                is_active, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&data.name)
        .bind(&data.host)
        .bind(data.port)
        .bind(data.use_ssl)
        .bind(&data.base_dn)
        .bind(&data.bind_dn)
        .bind(&data.bind_password)
        .bind(now)
        .bind(now)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as("SELECT * FROM directory_server_configs WHERE id = ?")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// The active profile, if any.
    pub async fn find_active<'e, E>(executor: E) -> Result<Option<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as("SELECT * FROM directory_server_configs WHERE is_active = 1")
            .fetch_optional(executor)
            .await
    }

    pub async fn list<'e, E>(executor: E) -> Result<Vec<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as("SELECT * FROM directory_server_configs ORDER BY name")
            .fetch_all(executor)
            .await
    }

    /// Make `id` the only active profile.
    ///
    /// Deactivation and activation run in one transaction. Returns `None`
    /// (and changes nothing) when `id` does not exist.
    pub async fn activate(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let now = Utc::now();

        sqlx::query(
            "UPDATE directory_server_configs SET is_active = 0, updated_at = ? WHERE is_active = 1",
        )
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let activated: Option<Self> = sqlx::query_as(
            r#"
            UPDATE directory_server_configs
            SET is_active = 1, updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(now)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        if activated.is_some() {
            tx.commit().await?;
        } else {
            tx.rollback().await?;
        }
        Ok(activated)
    }

    /// Store the outcome of a connection test.
    pub async fn record_test_result<'e, E>(
        executor: E,
        id: i64,
        ok: bool,
        message: &str,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let now = Utc::now();
        sqlx::query_as(
            r#"
            UPDATE directory_server_configs
            SET last_test_ok = ?, last_test_message = ?, last_tested_at = ?, updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(ok)
        .bind(message)
        .bind(now)
        .bind(now)
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    pub async fn delete<'e, E>(executor: E, id: i64) -> Result<bool, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM directory_server_configs WHERE id = ?")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
