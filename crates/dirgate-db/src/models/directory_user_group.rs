//! Membership edges between mirrored users and groups.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteExecutor};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DirectoryUserGroup {
    pub id: i64,
    pub user_id: i64,
    pub group_id: i64,
    pub created_at: DateTime<Utc>,
}

impl DirectoryUserGroup {
    /// Record a membership. Repeating it leaves exactly one edge.
    pub async fn add<'e, E>(executor: E, user_id: i64, group_id: i64) -> Result<(), sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query(
            r#"
            INSERT INTO directory_user_groups (user_id, group_id, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT (user_id, group_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(group_id)
        .bind(Utc::now())
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn remove<'e, E>(executor: E, user_id: i64, group_id: i64) -> Result<bool, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result =
            sqlx::query("DELETE FROM directory_user_groups WHERE user_id = ? AND group_id = ?")
                .bind(user_id)
                .bind(group_id)
                .execute(executor)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Number of edges between one user and one group (0 or 1).
    pub async fn count<'e, E>(executor: E, user_id: i64, group_id: i64) -> Result<i64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM directory_user_groups WHERE user_id = ? AND group_id = ?",
        )
        .bind(user_id)
        .bind(group_id)
        .fetch_one(executor)
        .await
    }

    /// Group names the user belongs to locally.
    pub async fn group_cns_for_user<'e, E>(executor: E, user_id: i64) -> Result<Vec<String>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_scalar(
            r#"
            SELECT g.cn FROM directory_user_groups ug
            JOIN directory_groups g ON g.id = ug.group_id
            WHERE ug.user_id = ?
            ORDER BY g.cn
            "#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await
    }
}
