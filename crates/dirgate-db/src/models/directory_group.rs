//! Local mirror of directory groups.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteExecutor};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DirectoryGroup {
    pub id: i64,
    pub cn: String,
    pub description: Option<String>,
    pub gid_number: Option<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Values observed in the directory for one group.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpsertDirectoryGroup {
    pub cn: String,
    pub description: Option<String>,
    pub gid_number: Option<i64>,
}

impl DirectoryGroup {
    /// Insert or refresh by `cn`; absent incoming values keep local ones.
    pub async fn upsert<'e, E>(executor: E, data: &UpsertDirectoryGroup) -> Result<Self, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let now = Utc::now();
        sqlx::query_as(
            r#"
            INSERT INTO directory_groups (cn, description, gid_number, is_active, created_at, updated_at)
            VALUES (?, NULLIF(?, ''), ?, 1, ?, ?)
            ON CONFLICT (cn) DO UPDATE SET
                description = COALESCE(excluded.description, directory_groups.description),
                gid_number = COALESCE(excluded.gid_number, directory_groups.gid_number),
                updated_at = excluded.updated_at
            RETURNING *
            "#,
        )
        .bind(&data.cn)
        .bind(&data.description)
        .bind(data.gid_number)
        .bind(now)
        .bind(now)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_cn<'e, E>(executor: E, cn: &str) -> Result<Option<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as("SELECT * FROM directory_groups WHERE cn = ?")
            .bind(cn)
            .fetch_optional(executor)
            .await
    }

    pub async fn list<'e, E>(executor: E) -> Result<Vec<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as("SELECT * FROM directory_groups ORDER BY cn")
            .fetch_all(executor)
            .await
    }

    pub async fn count<'e, E>(executor: E) -> Result<i64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_scalar("SELECT COUNT(*) FROM directory_groups")
            .fetch_one(executor)
            .await
    }
}
