//! Issued secrets.
//!
//! Rows are immutable apart from the delivery columns. The payload columns
//! hold envelope ciphertext; they are all NULL when no vault key was
//! configured at issuance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteExecutor};

/// Why a secret was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PasswordType {
    Initial,
    Reset,
}

impl PasswordType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Reset => "reset",
        }
    }
}

impl std::fmt::Display for PasswordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PasswordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "initial" => Ok(Self::Initial),
            "reset" => Ok(Self::Reset),
            _ => Err(format!("Invalid password type: {}", s)),
        }
    }
}

/// Issued secret record.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserPassword {
    pub id: i64,
    pub user_id: i64,
    /// `initial` or `reset`.
    pub password_type: String,
    pub ciphertext: Option<String>,
    pub wrapped_dek: Option<String>,
    pub kdf_salt: Option<String>,
    /// `argon2id$m=..,t=..,p=..`
    pub kdf_params: Option<String>,
    pub is_sent: bool,
    pub sent_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    /// Admin who issued the secret.
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Envelope columns of a sealed secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPayload {
    pub ciphertext: String,
    pub wrapped_dek: String,
    pub kdf_salt: String,
    pub kdf_params: String,
}

/// Data for issuing a secret.
#[derive(Debug, Clone)]
pub struct NewUserPassword {
    pub user_id: i64,
    pub password_type: PasswordType,
    pub payload: Option<EncryptedPayload>,
    pub expires_at: DateTime<Utc>,
    pub created_by: String,
}

impl UserPassword {
    pub async fn insert<'e, E>(executor: E, data: &NewUserPassword) -> Result<Self, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let payload = data.payload.as_ref();
        sqlx::query_as(
            r#"
            INSERT INTO user_passwords (
                user_id, password_type, ciphertext, wrapped_dek, kdf_salt, kdf_params,
                is_sent, expires_at, created_by, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(data.user_id)
        .bind(data.password_type.as_str())
        .bind(payload.map(|p| p.ciphertext.as_str()))
        .bind(payload.map(|p| p.wrapped_dek.as_str()))
        .bind(payload.map(|p| p.kdf_salt.as_str()))
        .bind(payload.map(|p| p.kdf_params.as_str()))
        .bind(data.expires_at)
        .bind(&data.created_by)
        .bind(Utc::now())
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as("SELECT * FROM user_passwords WHERE id = ?")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Newest first.
    pub async fn list_for_user<'e, E>(executor: E, user_id: i64) -> Result<Vec<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as("SELECT * FROM user_passwords WHERE user_id = ? ORDER BY id DESC")
            .bind(user_id)
            .fetch_all(executor)
            .await
    }

    pub async fn count_for_user<'e, E>(
        executor: E,
        user_id: i64,
        password_type: PasswordType,
    ) -> Result<i64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM user_passwords WHERE user_id = ? AND password_type = ?",
        )
        .bind(user_id)
        .bind(password_type.as_str())
        .fetch_one(executor)
        .await
    }

    /// Record a successful delivery.
    pub async fn mark_sent<'e, E>(executor: E, id: i64) -> Result<bool, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result =
            sqlx::query("UPDATE user_passwords SET is_sent = 1, sent_at = ? WHERE id = ?")
                .bind(Utc::now())
                .bind(id)
                .execute(executor)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Envelope columns, when all are present.
    #[must_use]
    pub fn payload(&self) -> Option<EncryptedPayload> {
        Some(EncryptedPayload {
            ciphertext: self.ciphertext.clone()?,
            wrapped_dek: self.wrapped_dek.clone()?,
            kdf_salt: self.kdf_salt.clone()?,
            kdf_params: self.kdf_params.clone()?,
        })
    }

    #[must_use]
    pub fn kind(&self) -> Option<PasswordType> {
        self.password_type.parse().ok()
    }

    /// Expired once `expires_at` is at or before `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
