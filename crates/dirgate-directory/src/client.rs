//! The `DirectoryClient` seam.
//!
//! Both the LDAP gateway and the in-memory directory implement this trait;
//! the lifecycle manager only ever sees `Arc<dyn DirectoryClient>`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entry::{DirectoryGroupEntry, DirectoryUserEntry, NewDirectoryUser, UserChanges};
use crate::error::DirectoryResult;

/// Post-steps run after a successful password set. Each one may fail on
/// its own without failing the password change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordPostStep {
    /// Push `krbPasswordExpiration` to the far-future sentinel and clear `nsAccountLock`.
    RelaxPolicy,
    /// Remove `krbLoginFailedCount`.
    ClearLoginFailures,
}

impl PasswordPostStep {
    /// All post-steps, in execution order.
    pub const ALL: [PasswordPostStep; 2] = [Self::RelaxPolicy, Self::ClearLoginFailures];

    /// Name used in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::RelaxPolicy => "relax-policy",
            Self::ClearLoginFailures => "clear-login-failures",
        }
    }
}

impl std::fmt::Display for PasswordPostStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Protocol-level operations against an identity directory.
///
/// Every call acquires its own connection and releases it before returning.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Short name of the backend, for logs.
    fn backend_name(&self) -> &'static str;

    /// Base DN all entries live under.
    fn base_dn(&self) -> &str;

    /// Open, bind, and read the base entry.
    async fn test_connection(&self) -> DirectoryResult<()>;

    /// Check a user's own credentials by binding as them.
    async fn authenticate(&self, uid: &str, password: &str) -> DirectoryResult<bool>;

    /// Add a user entry with `password` as its initial secret.
    async fn create_user(&self, user: &NewDirectoryUser, password: &str) -> DirectoryResult<()>;

    /// Replace the non-empty attributes in `changes`.
    async fn update_user(&self, uid: &str, changes: &UserChanges) -> DirectoryResult<()>;

    async fn delete_user(&self, uid: &str) -> DirectoryResult<()>;

    async fn get_user(&self, uid: &str) -> DirectoryResult<Option<DirectoryUserEntry>>;

    /// Up to `limit` user entries.
    async fn list_users(&self, limit: usize) -> DirectoryResult<Vec<DirectoryUserEntry>>;

    async fn create_group(&self, cn: &str, description: Option<&str>) -> DirectoryResult<()>;

    async fn list_groups(&self) -> DirectoryResult<Vec<DirectoryGroupEntry>>;

    /// Idempotent: an already-present member is success.
    async fn add_user_to_group(&self, uid: &str, group_cn: &str) -> DirectoryResult<()>;

    /// Idempotent: an absent member is success.
    async fn remove_user_from_group(&self, uid: &str, group_cn: &str) -> DirectoryResult<()>;

    /// Set a password through the password-modify extended operation, then
    /// run every [`PasswordPostStep`] best-effort.
    async fn set_password(
        &self,
        uid: &str,
        new_password: &str,
        old_password: Option<&str>,
    ) -> DirectoryResult<()>;

    /// Run the relax-policy and clear-login-failures steps as a primary operation.
    async fn relax_password_policy(&self, uid: &str) -> DirectoryResult<()>;

    /// `Some` sets `krbPrincipalExpiration`; `None` removes it.
    async fn set_principal_expiration(
        &self,
        uid: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> DirectoryResult<()>;

    async fn enable(&self, uid: &str) -> DirectoryResult<()>;

    async fn disable(&self, uid: &str) -> DirectoryResult<()>;

    async fn lock(&self, uid: &str) -> DirectoryResult<()>;

    async fn unlock(&self, uid: &str) -> DirectoryResult<()>;
}
