//! Local mirror of directory users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteExecutor};

/// Mirrored directory user.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DirectoryUser {
    pub id: i64,
    pub uid: String,
    pub cn: String,
    pub sn: String,
    pub given_name: String,
    pub mail: String,
    pub mobile: Option<String>,
    /// Last time the row was refreshed from a directory read.
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Values observed in the directory for one user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpsertDirectoryUser {
    pub uid: String,
    pub cn: String,
    pub sn: String,
    pub given_name: String,
    pub mail: String,
    pub mobile: Option<String>,
    /// When the values were read from the directory. `None` for local
    /// writes, which keep the previous sync time.
    pub synced_at: Option<DateTime<Utc>>,
}

/// Local edit. `None` leaves the column unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectoryUserChanges {
    pub cn: Option<String>,
    pub sn: Option<String>,
    pub given_name: Option<String>,
    pub mail: Option<String>,
    pub mobile: Option<String>,
}

impl DirectoryUser {
    /// Insert or refresh by `uid`.
    ///
    /// Only non-empty incoming values overwrite existing columns, so a
    /// sparse directory entry never blanks a local value.
    pub async fn upsert<'e, E>(executor: E, data: &UpsertDirectoryUser) -> Result<Self, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let now = Utc::now();
        sqlx::query_as(
            r#"
            INSERT INTO directory_users (
                uid, cn, sn, given_name, mail, mobile,
                last_synced_at, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, NULLIF(?, ''), ?, ?, ?)
            ON CONFLICT (uid) DO UPDATE SET
                cn = COALESCE(NULLIF(excluded.cn, ''), directory_users.cn),
                sn = COALESCE(NULLIF(excluded.sn, ''), directory_users.sn),
                given_name = COALESCE(NULLIF(excluded.given_name, ''), directory_users.given_name),
                mail = COALESCE(NULLIF(excluded.mail, ''), directory_users.mail),
                mobile = COALESCE(excluded.mobile, directory_users.mobile),
                last_synced_at = COALESCE(excluded.last_synced_at, directory_users.last_synced_at),
                updated_at = excluded.updated_at
            RETURNING *
            "#,
        )
        .bind(&data.uid)
        .bind(&data.cn)
        .bind(&data.sn)
        .bind(&data.given_name)
        .bind(&data.mail)
        .bind(&data.mobile)
        .bind(data.synced_at)
        .bind(now)
        .bind(now)
        .fetch_one(executor)
        .await
    }

    /// Row for `uid`, creating a bare one if the user is not mirrored yet.
    pub async fn ensure<'e, E>(executor: E, uid: &str) -> Result<Self, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let now = Utc::now();
        sqlx::query_as(
            r#"
            INSERT INTO directory_users (uid, created_at, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT (uid) DO UPDATE SET uid = excluded.uid
            RETURNING *
            "#,
        )
        .bind(uid)
        .bind(now)
        .bind(now)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_uid<'e, E>(executor: E, uid: &str) -> Result<Option<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as("SELECT * FROM directory_users WHERE uid = ?")
            .bind(uid)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as("SELECT * FROM directory_users WHERE id = ?")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn list<'e, E>(executor: E, limit: i64, offset: i64) -> Result<Vec<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as("SELECT * FROM directory_users ORDER BY uid LIMIT ? OFFSET ?")
            .bind(limit)
            .bind(offset)
            .fetch_all(executor)
            .await
    }

    /// Apply a local edit.
    pub async fn update<'e, E>(
        executor: E,
        uid: &str,
        changes: &DirectoryUserChanges,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as(
            r#"
            UPDATE directory_users SET
                cn = COALESCE(?, cn),
                sn = COALESCE(?, sn),
                given_name = COALESCE(?, given_name),
                mail = COALESCE(?, mail),
                mobile = COALESCE(?, mobile),
                updated_at = ?
            WHERE uid = ?
            RETURNING *
            "#,
        )
        .bind(&changes.cn)
        .bind(&changes.sn)
        .bind(&changes.given_name)
        .bind(&changes.mail)
        .bind(&changes.mobile)
        .bind(Utc::now())
        .bind(uid)
        .fetch_optional(executor)
        .await
    }

    /// Remove the mirror row. Memberships and issued secrets cascade.
    pub async fn delete_by_uid<'e, E>(executor: E, uid: &str) -> Result<bool, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM directory_users WHERE uid = ?")
            .bind(uid)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count<'e, E>(executor: E) -> Result<i64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_scalar("SELECT COUNT(*) FROM directory_users")
            .fetch_one(executor)
            .await
    }

    /// Display name, falling back to the uid.
    #[must_use]
    pub fn full_name(&self) -> String {
        if !self.cn.is_empty() {
            return self.cn.clone();
        }
        let joined = format!("{} {}", self.given_name, self.sn);
        let joined = joined.trim();
        if joined.is_empty() {
            self.uid.clone()
        } else {
            joined.to_string()
        }
    }
}
