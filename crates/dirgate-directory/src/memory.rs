//! In-process directory
//!
//! Mirrors the LDAP gateway's DN rules and error mapping without a server.
//! Every call is recorded in a journal so callers can assert which protocol
//! path an operation took.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::client::{DirectoryClient, PasswordPostStep};
use crate::config::DirectorySettings;
use crate::dn;
use crate::entry::{DirectoryGroupEntry, DirectoryUserEntry, NewDirectoryUser, UserChanges};
use crate::error::{DirectoryError, DirectoryResult};

/// One recorded directory call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryOp {
    AddUser { uid: String },
    /// Plain attribute replace; lists the attribute names touched.
    ModifyUser { uid: String, attributes: Vec<String> },
    /// Password-modify extended operation.
    PasswordModify { uid: String },
    PostStep { uid: String, step: PasswordPostStep, ok: bool },
    DeleteUser { uid: String },
    AddGroup { cn: String },
    AddMember { uid: String, group: String },
    RemoveMember { uid: String, group: String },
}

#[derive(Debug, Clone)]
struct StoredUser {
    entry: DirectoryUserEntry,
    password: String,
    password_expiration: Option<String>,
    last_admin_unlock: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    users: BTreeMap<String, StoredUser>,
    groups: BTreeMap<String, DirectoryGroupEntry>,
    journal: Vec<DirectoryOp>,
    unreachable: bool,
    failing_operations: HashMap<&'static str, String>,
    failing_post_steps: bool,
}

/// Directory held in memory.
pub struct InMemoryDirectory {
    base_dn: String,
    realm: String,
    lockout_threshold: u32,
    state: Mutex<State>,
}

impl InMemoryDirectory {
    /// Create an empty directory rooted at `base_dn`.
    pub fn new(base_dn: impl Into<String>) -> Self {
        let base_dn = base_dn.into();
        Self {
            realm: dn::realm_from_base_dn(&base_dn),
            base_dn,
            lockout_threshold: 6,
            state: Mutex::new(State::default()),
        }
    }

    /// Create from gateway settings.
    #[must_use]
    pub fn from_settings(settings: &DirectorySettings) -> Self {
        let mut directory = Self::new(settings.base_dn.clone());
        directory.lockout_threshold = settings.lockout_threshold;
        directory
    }

    /// Seed a user entry.
    pub async fn insert_user(&self, entry: DirectoryUserEntry, password: impl Into<String>) {
        let mut state = self.state.lock().await;
        let mut entry = entry;
        entry.dn = dn::user_dn(&entry.uid, &self.base_dn);
        state.users.insert(
            entry.uid.clone(),
            StoredUser {
                entry,
                password: password.into(),
                password_expiration: None,
                last_admin_unlock: None,
            },
        );
    }

    /// Make every operation fail as if the server were down.
    pub async fn set_unreachable(&self, unreachable: bool) {
        self.state.lock().await.unreachable = unreachable;
    }

    /// Make `operation` (a `DirectoryClient` method name) fail with `message`.
    pub async fn fail_operation(&self, operation: &'static str, message: impl Into<String>) {
        self.state
            .lock()
            .await
            .failing_operations
            .insert(operation, message.into());
    }

    /// Make every password post-step fail.
    pub async fn fail_post_steps(&self, failing: bool) {
        self.state.lock().await.failing_post_steps = failing;
    }

    /// Recorded calls, oldest first.
    pub async fn journal(&self) -> Vec<DirectoryOp> {
        self.state.lock().await.journal.clone()
    }

    /// Current password of `uid`.
    pub async fn password_of(&self, uid: &str) -> Option<String> {
        self.state
            .lock()
            .await
            .users
            .get(uid)
            .map(|u| u.password.clone())
    }

    /// Current `krbPasswordExpiration` of `uid`.
    pub async fn password_expiration_of(&self, uid: &str) -> Option<String> {
        self.state
            .lock()
            .await
            .users
            .get(uid)
            .and_then(|u| u.password_expiration.clone())
    }

    /// Current `krbLastAdminUnlock` of `uid`.
    pub async fn last_admin_unlock_of(&self, uid: &str) -> Option<String> {
        self.state
            .lock()
            .await
            .users
            .get(uid)
            .and_then(|u| u.last_admin_unlock.clone())
    }

    /// Member uids of `group_cn`.
    pub async fn members_of(&self, group_cn: &str) -> Vec<String> {
        self.state
            .lock()
            .await
            .groups
            .get(group_cn)
            .map(|g| {
                g.members
                    .iter()
                    .filter_map(|m| dn::rdn_value(m).map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn check(state: &State, operation: &'static str) -> DirectoryResult<()> {
        if state.unreachable {
            return Err(DirectoryError::connect_failed(format!(
                "Failed to connect to directory for {operation}"
            )));
        }
        if let Some(message) = state.failing_operations.get(operation) {
            return Err(DirectoryError::operation_failed(message.clone()));
        }
        Ok(())
    }

    fn user_mut<'a>(&self, state: &'a mut State, uid: &str) -> DirectoryResult<&'a mut StoredUser> {
        state.users.get_mut(uid).ok_or_else(|| DirectoryError::NotFound {
            dn: dn::user_dn(uid, &self.base_dn),
        })
    }

    fn apply_post_step(&self, state: &mut State, uid: &str, step: PasswordPostStep) -> DirectoryResult<()> {
        let failing = state.failing_post_steps;
        let result = if failing {
            Err(DirectoryError::operation_failed(format!(
                "LDAP modify failed with code 50: {} rejected",
                step
            )))
        } else {
            self.user_mut(state, uid).map(|user| match step {
                PasswordPostStep::RelaxPolicy => {
                    user.password_expiration = Some(dn::PASSWORD_EXPIRATION_SENTINEL.to_string());
                    user.entry.account_locked = Some(false);
                }
                PasswordPostStep::ClearLoginFailures => {
                    user.entry.login_failed_count = None;
                }
            })
        };

        state.journal.push(DirectoryOp::PostStep {
            uid: uid.to_string(),
            step,
            ok: result.is_ok(),
        });
        result
    }

    async fn modify_account(
        &self,
        operation: &'static str,
        uid: &str,
        attributes: &[&str],
        apply: impl FnOnce(&mut StoredUser),
    ) -> DirectoryResult<()> {
        let mut state = self.state.lock().await;
        Self::check(&state, operation)?;
        apply(self.user_mut(&mut state, uid)?);
        state.journal.push(DirectoryOp::ModifyUser {
            uid: uid.to_string(),
            attributes: attributes.iter().map(|a| (*a).to_string()).collect(),
        });
        debug!(uid = %uid, operation, "In-memory account modified");
        Ok(())
    }
}

#[async_trait]
impl DirectoryClient for InMemoryDirectory {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn base_dn(&self) -> &str {
        &self.base_dn
    }

    async fn test_connection(&self) -> DirectoryResult<()> {
        let state = self.state.lock().await;
        Self::check(&state, "test_connection")
    }

    async fn authenticate(&self, uid: &str, password: &str) -> DirectoryResult<bool> {
        let state = self.state.lock().await;
        Self::check(&state, "authenticate")?;
        if password.is_empty() {
            return Ok(false);
        }
        Ok(state.users.get(uid).is_some_and(|u| {
            u.password == password
                && u.entry.account_locked != Some(true)
                && u.entry
                    .login_failed_count
                    .map_or(true, |count| count < self.lockout_threshold)
        }))
    }

    async fn create_user(&self, user: &NewDirectoryUser, password: &str) -> DirectoryResult<()> {
        if user.uid.is_empty() {
            return Err(DirectoryError::invalid_input("uid is required"));
        }

        let mut state = self.state.lock().await;
        Self::check(&state, "create_user")?;

        let user_dn = dn::user_dn(&user.uid, &self.base_dn);
        if state.users.contains_key(&user.uid) {
            return Err(DirectoryError::AlreadyExists { dn: user_dn });
        }

        let entry = DirectoryUserEntry {
            dn: user_dn,
            uid: user.uid.clone(),
            cn: Some(user.cn.clone()),
            sn: Some(user.sn.clone()),
            given_name: Some(user.given_name.clone()),
            mail: Some(user.mail.clone()),
            mobile: user.mobile.clone().filter(|m| !m.is_empty()),
            account_locked: None,
            principal_expiration: None,
            login_failed_count: None,
        };
        state.users.insert(
            user.uid.clone(),
            StoredUser {
                entry,
                password: password.to_string(),
                password_expiration: None,
                last_admin_unlock: None,
            },
        );
        state.journal.push(DirectoryOp::AddUser {
            uid: user.uid.clone(),
        });

        debug!(uid = %user.uid, principal = %format!("{}@{}", user.uid, self.realm), "In-memory user created");
        Ok(())
    }

    async fn update_user(&self, uid: &str, changes: &UserChanges) -> DirectoryResult<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut state = self.state.lock().await;
        Self::check(&state, "update_user")?;

        let replacements = changes.attribute_replacements();
        let user = self.user_mut(&mut state, uid)?;
        for (attr, value) in &replacements {
            match *attr {
                "mail" => user.entry.mail = Some(value.clone()),
                "mobile" => user.entry.mobile = Some(value.clone()),
                "cn" => user.entry.cn = Some(value.clone()),
                "sn" => user.entry.sn = Some(value.clone()),
                "givenName" => user.entry.given_name = Some(value.clone()),
                _ => {}
            }
        }
        if let Some(password) = changes.new_password() {
            user.password = password.to_string();
        }

        if !replacements.is_empty() {
            state.journal.push(DirectoryOp::ModifyUser {
                uid: uid.to_string(),
                attributes: replacements.iter().map(|(a, _)| (*a).to_string()).collect(),
            });
        }
        if changes.new_password().is_some() {
            state.journal.push(DirectoryOp::PasswordModify {
                uid: uid.to_string(),
            });
        }
        Ok(())
    }

    async fn delete_user(&self, uid: &str) -> DirectoryResult<()> {
        let mut state = self.state.lock().await;
        Self::check(&state, "delete_user")?;

        let user_dn = dn::user_dn(uid, &self.base_dn);
        if state.users.remove(uid).is_none() {
            return Err(DirectoryError::NotFound { dn: user_dn });
        }
        for group in state.groups.values_mut() {
            group.members.retain(|m| m != &user_dn);
        }
        state.journal.push(DirectoryOp::DeleteUser {
            uid: uid.to_string(),
        });
        Ok(())
    }

    async fn get_user(&self, uid: &str) -> DirectoryResult<Option<DirectoryUserEntry>> {
        let state = self.state.lock().await;
        Self::check(&state, "get_user")?;
        Ok(state.users.get(uid).map(|u| u.entry.clone()))
    }

    async fn list_users(&self, limit: usize) -> DirectoryResult<Vec<DirectoryUserEntry>> {
        let state = self.state.lock().await;
        Self::check(&state, "list_users")?;
        Ok(state
            .users
            .values()
            .take(limit)
            .map(|u| u.entry.clone())
            .collect())
    }

    async fn create_group(&self, cn: &str, description: Option<&str>) -> DirectoryResult<()> {
        if cn.is_empty() {
            return Err(DirectoryError::invalid_input("group cn is required"));
        }

        let mut state = self.state.lock().await;
        Self::check(&state, "create_group")?;

        let group_dn = dn::group_dn(cn, &self.base_dn);
        if state.groups.contains_key(cn) {
            return Err(DirectoryError::AlreadyExists { dn: group_dn });
        }

        state.groups.insert(
            cn.to_string(),
            DirectoryGroupEntry {
                dn: group_dn,
                cn: cn.to_string(),
                description: description.map(str::to_string),
                gid_number: None,
                members: Vec::new(),
            },
        );
        state.journal.push(DirectoryOp::AddGroup { cn: cn.to_string() });
        Ok(())
    }

    async fn list_groups(&self) -> DirectoryResult<Vec<DirectoryGroupEntry>> {
        let state = self.state.lock().await;
        Self::check(&state, "list_groups")?;
        Ok(state.groups.values().cloned().collect())
    }

    async fn add_user_to_group(&self, uid: &str, group_cn: &str) -> DirectoryResult<()> {
        let mut state = self.state.lock().await;
        Self::check(&state, "add_user_to_group")?;

        let member = dn::user_dn(uid, &self.base_dn);
        let group = state
            .groups
            .get_mut(group_cn)
            .ok_or_else(|| DirectoryError::NotFound {
                dn: dn::group_dn(group_cn, &self.base_dn),
            })?;
        if !group.members.contains(&member) {
            group.members.push(member);
        }
        state.journal.push(DirectoryOp::AddMember {
            uid: uid.to_string(),
            group: group_cn.to_string(),
        });
        Ok(())
    }

    async fn remove_user_from_group(&self, uid: &str, group_cn: &str) -> DirectoryResult<()> {
        let mut state = self.state.lock().await;
        Self::check(&state, "remove_user_from_group")?;

        let member = dn::user_dn(uid, &self.base_dn);
        let group = state
            .groups
            .get_mut(group_cn)
            .ok_or_else(|| DirectoryError::NotFound {
                dn: dn::group_dn(group_cn, &self.base_dn),
            })?;
        group.members.retain(|m| m != &member);
        state.journal.push(DirectoryOp::RemoveMember {
            uid: uid.to_string(),
            group: group_cn.to_string(),
        });
        Ok(())
    }

    async fn set_password(
        &self,
        uid: &str,
        new_password: &str,
        old_password: Option<&str>,
    ) -> DirectoryResult<()> {
        if new_password.is_empty() {
            return Err(DirectoryError::invalid_input("password must not be empty"));
        }

        let mut state = self.state.lock().await;
        Self::check(&state, "set_password")?;

        let user = self.user_mut(&mut state, uid)?;
        if let Some(old) = old_password {
            if user.password != old {
                return Err(DirectoryError::operation_failed(
                    "LDAP password modify failed with code 19: old password mismatch",
                ));
            }
        }
        user.password = new_password.to_string();
        state.journal.push(DirectoryOp::PasswordModify {
            uid: uid.to_string(),
        });

        for step in PasswordPostStep::ALL {
            if let Err(e) = self.apply_post_step(&mut state, uid, step) {
                warn!(uid = %uid, step = %step, error = %e, "Best-effort password post-step failed");
            }
        }
        Ok(())
    }

    async fn relax_password_policy(&self, uid: &str) -> DirectoryResult<()> {
        let mut state = self.state.lock().await;
        Self::check(&state, "relax_password_policy")?;
        for step in PasswordPostStep::ALL {
            self.apply_post_step(&mut state, uid, step)?;
        }
        Ok(())
    }

    async fn set_principal_expiration(
        &self,
        uid: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> DirectoryResult<()> {
        // Stored at generalized-time precision, as the directory would.
        let truncated = expires_at.and_then(|at| {
            dn::parse_generalized_time(&dn::format_generalized_time(at))
        });
        self.modify_account(
            "set_principal_expiration",
            uid,
            &["krbPrincipalExpiration"],
            |user| user.entry.principal_expiration = truncated,
        )
        .await
    }

    async fn enable(&self, uid: &str) -> DirectoryResult<()> {
        self.modify_account("enable", uid, &["nsAccountLock"], |user| {
            user.entry.account_locked = Some(false);
        })
        .await
    }

    async fn disable(&self, uid: &str) -> DirectoryResult<()> {
        self.modify_account("disable", uid, &["nsAccountLock"], |user| {
            user.entry.account_locked = Some(true);
        })
        .await
    }

    async fn lock(&self, uid: &str) -> DirectoryResult<()> {
        let threshold = self.lockout_threshold;
        self.modify_account("lock", uid, &["krbLoginFailedCount"], |user| {
            user.entry.login_failed_count = Some(threshold);
        })
        .await
    }

    async fn unlock(&self, uid: &str) -> DirectoryResult<()> {
        let now = dn::format_generalized_time(Utc::now());
        self.modify_account(
            "unlock",
            uid,
            &["krbLoginFailedCount", "krbLastAdminUnlock"],
            |user| {
                user.entry.login_failed_count = None;
                user.last_admin_unlock = Some(now);
            },
        )
        .await
    }
}

impl std::fmt::Debug for InMemoryDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDirectory")
            .field("base_dn", &self.base_dn)
            .finish_non_exhaustive()
    }
}
