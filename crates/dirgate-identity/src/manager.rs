//! Identity lifecycle orchestration.
//!
//! Every write follows the same order: directory first, then the local
//! mirror, then (optionally) SMS delivery. A directory failure leaves the
//! mirror untouched; a mirror failure after a directory success is reported
//! as [`LifecycleError::LocalWriteFailed`]; delivery failures are reported in
//! the outcome and never undo committed state.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, instrument, warn};

use dirgate_db::models::{
    DirectoryGroup, DirectoryServerConfig, DirectoryUser, DirectoryUserChanges,
    DirectoryUserGroup, EncryptedPayload, NewUserPassword, PasswordType, UpsertDirectoryGroup,
    UpsertDirectoryUser, UserPassword,
};
use dirgate_db::{DbError, DbPool};
use dirgate_directory::{dn, DirectoryClient, DirectoryError, NewDirectoryUser, UserChanges};
use dirgate_notify::{NotificationDispatcher, SecretNotice};
use dirgate_secrets::{EnvelopeVault, SealedSecret, SecretIssuer, SecretValue, VaultError};

use crate::error::{LifecycleError, LifecycleResult};
use crate::outcome::{
    ConnectionTest, CreatedUser, DeliveryOutcome, GroupFailure, GroupSyncSummary, LifecycleOutcome,
    PasswordChanged, PrincipalExpiration, SyncSummary,
};
use crate::request::{validate_uid, AdminId, CreateUserRequest, ExpirationChange, UpdateUserRequest};

/// Default lifetime of an issued secret.
pub const DEFAULT_SECRET_TTL_DAYS: i64 = 7;

/// Default number of entries read by `sync_from_directory`.
pub const DEFAULT_SYNC_LIMIT: usize = 1000;

/// Coordinates the directory, the vault, the local mirror and SMS delivery.
pub struct IdentityLifecycleManager {
    directory: Arc<dyn DirectoryClient>,
    db: DbPool,
    vault: Arc<EnvelopeVault>,
    dispatcher: Option<Arc<NotificationDispatcher>>,
    issuer: SecretIssuer,
    secret_ttl: Duration,
    sync_limit: usize,
}

impl IdentityLifecycleManager {
    pub fn new(directory: Arc<dyn DirectoryClient>, db: DbPool, vault: EnvelopeVault) -> Self {
        Self {
            directory,
            db,
            vault: Arc::new(vault),
            dispatcher: None,
            issuer: SecretIssuer::default(),
            secret_ttl: Duration::days(DEFAULT_SECRET_TTL_DAYS),
            sync_limit: DEFAULT_SYNC_LIMIT,
        }
    }

    /// Enable SMS delivery.
    #[must_use]
    pub fn with_dispatcher(mut self, dispatcher: Arc<NotificationDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    #[must_use]
    pub fn with_issuer(mut self, issuer: SecretIssuer) -> Self {
        self.issuer = issuer;
        self
    }

    #[must_use]
    pub fn with_secret_ttl(mut self, ttl: Duration) -> Self {
        self.secret_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_sync_limit(mut self, limit: usize) -> Self {
        self.sync_limit = limit;
        self
    }

    #[must_use]
    pub fn db(&self) -> &DbPool {
        &self.db
    }

    #[must_use]
    pub fn directory(&self) -> &Arc<dyn DirectoryClient> {
        &self.directory
    }

    // ---------------------------------------------------------------------
    // Provisioning and secrets
    // ---------------------------------------------------------------------

    /// Provision a user and issue the initial secret.
    #[instrument(skip(self, request), fields(uid = %request.uid, admin = %admin))]
    pub async fn create_user(
        &self,
        request: CreateUserRequest,
        admin: &AdminId,
    ) -> LifecycleResult<LifecycleOutcome<CreatedUser>> {
        request.validate()?;
        let uid = request.uid.trim().to_string();

        let secret = match &request.password {
            Some(password) if !password.is_empty() => SecretValue::new(password.clone()),
            _ => self.issuer.issue(),
        };
        let payload = self.seal(&secret).await?;

        let entry = NewDirectoryUser {
            uid: uid.clone(),
            cn: request.cn.clone(),
            sn: request.sn.clone(),
            given_name: request.given_name.clone(),
            mail: request.mail.clone(),
            mobile: request.mobile.clone().filter(|m| !m.trim().is_empty()),
        };
        self.directory.create_user(&entry, secret.expose()).await?;
        info!(uid = %uid, "User created in directory");

        let mirror = UpsertDirectoryUser {
            uid: uid.clone(),
            cn: entry.cn.clone(),
            sn: entry.sn.clone(),
            given_name: entry.given_name.clone(),
            mail: entry.mail.clone(),
            mobile: entry.mobile.clone(),
            synced_at: None,
        };
        let (user, record) = self
            .record_secret(&mirror, PasswordType::Initial, payload, admin)
            .await
            .map_err(|e| LifecycleError::local_write("create_user", &uid, e))?;

        let mut group_failures = Vec::new();
        for group_cn in &request.groups {
            let group_cn = group_cn.trim();
            if let Err(e) = self.join_group(&user, group_cn).await {
                warn!(uid = %uid, group = %group_cn, error = %e, "Group membership not applied");
                group_failures.push(GroupFailure {
                    group: group_cn.to_string(),
                    error: e.to_string(),
                });
            }
        }

        let delivery = if request.send_sms {
            self.deliver(&user, record.id, &secret).await
        } else {
            DeliveryOutcome::NotRequested
        };

        let groups_note = if group_failures.is_empty() {
            String::new()
        } else {
            let names: Vec<&str> = group_failures.iter().map(|f| f.group.as_str()).collect();
            format!("; not added to group(s): {}", names.join(", "))
        };
        Ok(LifecycleOutcome::new(
            format!("User '{uid}' created{groups_note}{}", delivery.summary()),
            CreatedUser {
                uid,
                secret,
                issued_secret_id: record.id,
                group_failures,
                delivery,
            },
        ))
    }

    /// Reset a user's password through the directory password-modify
    /// operation and issue a `reset` secret.
    #[instrument(skip(self, new_password), fields(admin = %admin))]
    pub async fn change_password(
        &self,
        uid: &str,
        new_password: Option<String>,
        send_sms: bool,
        admin: &AdminId,
    ) -> LifecycleResult<LifecycleOutcome<PasswordChanged>> {
        validate_uid(uid)?;

        let secret = match new_password {
            Some(password) if !password.is_empty() => SecretValue::new(password),
            _ => self.issuer.issue(),
        };
        let payload = self.seal(&secret).await?;

        self.directory.set_password(uid, secret.expose(), None).await?;
        info!(uid = %uid, "Password changed in directory");

        let mirror = UpsertDirectoryUser {
            uid: uid.to_string(),
            ..Default::default()
        };
        let (user, record) = self
            .record_secret(&mirror, PasswordType::Reset, payload, admin)
            .await
            .map_err(|e| LifecycleError::local_write("change_password", uid, e))?;

        let delivery = if send_sms {
            self.deliver(&user, record.id, &secret).await
        } else {
            DeliveryOutcome::NotRequested
        };

        Ok(LifecycleOutcome::new(
            format!("Password for '{uid}' changed{}", delivery.summary()),
            PasswordChanged {
                uid: uid.to_string(),
                secret,
                issued_secret_id: record.id,
                delivery,
            },
        ))
    }

    /// Deliver a previously issued secret again.
    #[instrument(skip(self))]
    pub async fn resend_secret(
        &self,
        issued_secret_id: i64,
    ) -> LifecycleResult<LifecycleOutcome<DeliveryOutcome>> {
        let record = UserPassword::find_by_id(self.db.inner(), issued_secret_id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound(format!("issued secret {issued_secret_id}")))?;

        if record.is_expired_at(Utc::now()) {
            warn!(id = record.id, "Refusing to resend expired secret");
            return Err(LifecycleError::Expired {
                id: record.id,
                expired_at: record.expires_at,
            });
        }

        let user = DirectoryUser::find_by_id(self.db.inner(), record.user_id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound(format!("directory user {}", record.user_id)))?;
        if self.dispatcher.is_none() {
            return Err(LifecycleError::Validation(
                "SMS delivery is not configured".to_string(),
            ));
        }
        if mobile_of(&user).is_none() {
            return Err(LifecycleError::Validation(format!(
                "user '{}' has no mobile number",
                user.uid
            )));
        }

        let payload = record.payload().ok_or(VaultError::KeyUnavailable)?;
        let secret = self.open(to_sealed(&payload)?).await?;

        let delivery = self.deliver(&user, record.id, &secret).await;
        let message = if delivery.is_sent() {
            format!("Secret resent to '{}'", user.uid)
        } else {
            format!("Secret for '{}' not resent{}", user.uid, delivery.summary())
        };
        Ok(LifecycleOutcome::new(message, delivery))
    }

    // ---------------------------------------------------------------------
    // User maintenance
    // ---------------------------------------------------------------------

    #[instrument(skip(self, request))]
    pub async fn update_user(
        &self,
        uid: &str,
        request: UpdateUserRequest,
    ) -> LifecycleResult<LifecycleOutcome<DirectoryUser>> {
        validate_uid(uid)?;

        let changes = UserChanges {
            mail: request.mail.clone(),
            mobile: request.mobile.clone(),
            cn: request.cn.clone(),
            sn: request.sn.clone(),
            given_name: request.given_name.clone(),
            password: None,
        };
        self.directory.update_user(uid, &changes).await?;

        let local = DirectoryUserChanges {
            cn: non_empty(request.cn),
            sn: non_empty(request.sn),
            given_name: non_empty(request.given_name),
            mail: non_empty(request.mail),
            mobile: non_empty(request.mobile),
        };
        let user = self
            .apply_local_update(uid, &local)
            .await
            .map_err(|e| LifecycleError::local_write("update_user", uid, e))?;

        Ok(LifecycleOutcome::new(format!("User '{uid}' updated"), user))
    }

    /// Remove a user from the directory, then from the mirror.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, uid: &str) -> LifecycleResult<LifecycleOutcome<()>> {
        validate_uid(uid)?;
        self.directory.delete_user(uid).await?;

        DirectoryUser::delete_by_uid(self.db.inner(), uid)
            .await
            .map_err(|e| LifecycleError::local_write("delete_user", uid, e))?;

        Ok(LifecycleOutcome::new(format!("User '{uid}' deleted"), ()))
    }

    #[instrument(skip(self))]
    pub async fn enable_user(&self, uid: &str) -> LifecycleResult<LifecycleOutcome<()>> {
        validate_uid(uid)?;
        self.directory.enable(uid).await?;
        Ok(LifecycleOutcome::new(format!("User '{uid}' enabled"), ()))
    }

    #[instrument(skip(self))]
    pub async fn disable_user(&self, uid: &str) -> LifecycleResult<LifecycleOutcome<()>> {
        validate_uid(uid)?;
        self.directory.disable(uid).await?;
        Ok(LifecycleOutcome::new(format!("User '{uid}' disabled"), ()))
    }

    #[instrument(skip(self))]
    pub async fn lock_user(&self, uid: &str) -> LifecycleResult<LifecycleOutcome<()>> {
        validate_uid(uid)?;
        self.directory.lock(uid).await?;
        Ok(LifecycleOutcome::new(format!("User '{uid}' locked"), ()))
    }

    #[instrument(skip(self))]
    pub async fn unlock_user(&self, uid: &str) -> LifecycleResult<LifecycleOutcome<()>> {
        validate_uid(uid)?;
        self.directory.unlock(uid).await?;
        Ok(LifecycleOutcome::new(format!("User '{uid}' unlocked"), ()))
    }

    /// Push password expiration out and clear lockout state.
    #[instrument(skip(self))]
    pub async fn relax_password_policy(&self, uid: &str) -> LifecycleResult<LifecycleOutcome<()>> {
        validate_uid(uid)?;
        self.directory.relax_password_policy(uid).await?;
        Ok(LifecycleOutcome::new(
            format!("Password policy relaxed for '{uid}'"),
            (),
        ))
    }

    #[instrument(skip(self))]
    pub async fn set_principal_expiration(
        &self,
        uid: &str,
        change: ExpirationChange,
    ) -> LifecycleResult<LifecycleOutcome<PrincipalExpiration>> {
        validate_uid(uid)?;
        let expires_at = change.resolve(Utc::now())?;
        self.directory.set_principal_expiration(uid, expires_at).await?;

        let message = match expires_at {
            Some(at) => format!(
                "Principal '{uid}' expires at {}",
                at.format("%Y-%m-%d %H:%M:%S UTC")
            ),
            None => format!("Principal expiration cleared for '{uid}'"),
        };
        Ok(LifecycleOutcome::new(message, PrincipalExpiration { expires_at }))
    }

    // ---------------------------------------------------------------------
    // Groups
    // ---------------------------------------------------------------------

    #[instrument(skip(self, description))]
    pub async fn create_group(
        &self,
        cn: &str,
        description: Option<&str>,
    ) -> LifecycleResult<LifecycleOutcome<DirectoryGroup>> {
        if cn.trim().is_empty() {
            return Err(LifecycleError::Validation("group name must not be empty".to_string()));
        }
        self.directory.create_group(cn, description).await?;

        let group = DirectoryGroup::upsert(
            self.db.inner(),
            &UpsertDirectoryGroup {
                cn: cn.to_string(),
                description: description.map(str::to_string),
                gid_number: None,
            },
        )
        .await
        .map_err(|e| LifecycleError::local_write("create_group", cn, e))?;

        Ok(LifecycleOutcome::new(format!("Group '{cn}' created"), group))
    }

    /// Add a membership; repeating it is harmless.
    #[instrument(skip(self))]
    pub async fn add_to_group(&self, uid: &str, group_cn: &str) -> LifecycleResult<LifecycleOutcome<()>> {
        validate_uid(uid)?;
        self.directory.add_user_to_group(uid, group_cn).await?;

        self.record_membership(uid, group_cn)
            .await
            .map_err(|e| LifecycleError::local_write("add_to_group", uid, e))?;

        Ok(LifecycleOutcome::new(
            format!("User '{uid}' added to group '{group_cn}'"),
            (),
        ))
    }

    #[instrument(skip(self))]
    pub async fn remove_from_group(
        &self,
        uid: &str,
        group_cn: &str,
    ) -> LifecycleResult<LifecycleOutcome<()>> {
        validate_uid(uid)?;
        self.directory.remove_user_from_group(uid, group_cn).await?;

        self.forget_membership(uid, group_cn)
            .await
            .map_err(|e| LifecycleError::local_write("remove_from_group", uid, e))?;

        Ok(LifecycleOutcome::new(
            format!("User '{uid}' removed from group '{group_cn}'"),
            (),
        ))
    }

    // ---------------------------------------------------------------------
    // Reconciliation
    // ---------------------------------------------------------------------

    /// Upsert every directory user into the mirror. Never deletes, and an
    /// empty directory value never overwrites a local one.
    #[instrument(skip(self))]
    pub async fn sync_from_directory(&self) -> LifecycleResult<LifecycleOutcome<SyncSummary>> {
        let entries = self.directory.list_users(self.sync_limit).await?;
        let mut summary = SyncSummary::default();
        let synced_at = Some(Utc::now());

        for entry in entries.into_iter().filter(|e| !e.uid.is_empty()) {
            summary.seen += 1;
            let existed = DirectoryUser::find_by_uid(self.db.inner(), &entry.uid)
                .await?
                .is_some();

            DirectoryUser::upsert(
                self.db.inner(),
                &UpsertDirectoryUser {
                    uid: entry.uid.clone(),
                    cn: entry.cn.unwrap_or_default(),
                    sn: entry.sn.unwrap_or_default(),
                    given_name: entry.given_name.unwrap_or_default(),
                    mail: entry.mail.unwrap_or_default(),
                    mobile: entry.mobile.filter(|m| !m.is_empty()),
                    synced_at,
                },
            )
            .await?;

            if existed {
                summary.updated += 1;
            } else {
                summary.created += 1;
            }
        }

        info!(
            seen = summary.seen,
            created = summary.created,
            updated = summary.updated,
            "Directory users synchronized"
        );
        Ok(LifecycleOutcome::new(
            format!(
                "Synchronized {} users ({} new, {} updated)",
                summary.seen, summary.created, summary.updated
            ),
            summary,
        ))
    }

    /// Upsert directory groups and the memberships of mirrored users.
    #[instrument(skip(self))]
    pub async fn sync_groups(&self) -> LifecycleResult<LifecycleOutcome<GroupSyncSummary>> {
        let entries = self.directory.list_groups().await?;
        let mut summary = GroupSyncSummary::default();

        for entry in entries.into_iter().filter(|e| !e.cn.is_empty()) {
            let group = DirectoryGroup::upsert(
                self.db.inner(),
                &UpsertDirectoryGroup {
                    cn: entry.cn.clone(),
                    description: entry.description.clone(),
                    gid_number: entry.gid_number,
                },
            )
            .await?;
            summary.groups += 1;

            for member_dn in &entry.members {
                let Some(uid) = dn::rdn_value(member_dn) else {
                    continue;
                };
                if let Some(user) = DirectoryUser::find_by_uid(self.db.inner(), uid).await? {
                    DirectoryUserGroup::add(self.db.inner(), user.id, group.id).await?;
                    summary.memberships += 1;
                }
            }
        }

        Ok(LifecycleOutcome::new(
            format!(
                "Synchronized {} groups ({} memberships)",
                summary.groups, summary.memberships
            ),
            summary,
        ))
    }

    /// Check connectivity and record the result on the active server profile.
    #[instrument(skip(self))]
    pub async fn test_connection(&self) -> LifecycleResult<LifecycleOutcome<ConnectionTest>> {
        let result = self.directory.test_connection().await;
        let (ok, message) = match &result {
            Ok(()) => (true, "Connection successful".to_string()),
            Err(e) => (false, e.to_string()),
        };

        let recorded_on = match DirectoryServerConfig::find_active(self.db.inner()).await? {
            Some(config) => {
                DirectoryServerConfig::record_test_result(self.db.inner(), config.id, ok, &message)
                    .await?;
                Some(config.id)
            }
            None => None,
        };

        result?;
        Ok(LifecycleOutcome::new(
            message,
            ConnectionTest {
                backend: self.directory.backend_name().to_string(),
                base_dn: self.directory.base_dn().to_string(),
                recorded_on,
            },
        ))
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    /// Envelope-encrypt a secret for storage; `None` when the vault has no key.
    ///
    /// Argon2 runs on the blocking pool.
    async fn seal(&self, secret: &SecretValue) -> LifecycleResult<Option<EncryptedPayload>> {
        let vault = Arc::clone(&self.vault);
        let secret = secret.clone();
        let result = tokio::task::spawn_blocking(move || vault.seal(secret.expose()))
            .await
            .map_err(|e| VaultError::EncryptionFailed {
                message: format!("seal task failed: {e}"),
            })?;

        match result {
            Ok(sealed) => Ok(Some(to_payload(sealed))),
            Err(VaultError::KeyUnavailable) => {
                warn!("Vault has no master secret; issued secret stored without payload");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Decrypt a stored record on the blocking pool; fails closed.
    async fn open(&self, sealed: SealedSecret) -> LifecycleResult<SecretValue> {
        let vault = Arc::clone(&self.vault);
        let result = tokio::task::spawn_blocking(move || vault.open(&sealed))
            .await
            .map_err(|_| VaultError::DecryptionFailed)?;
        Ok(result?)
    }

    /// Mirror row and issued-secret row in one transaction.
    async fn record_secret(
        &self,
        mirror: &UpsertDirectoryUser,
        password_type: PasswordType,
        payload: Option<EncryptedPayload>,
        admin: &AdminId,
    ) -> Result<(DirectoryUser, UserPassword), DbError> {
        let mut tx = self.db.begin().await?;

        let user = DirectoryUser::upsert(&mut *tx, mirror).await?;
        let record = UserPassword::insert(
            &mut *tx,
            &NewUserPassword {
                user_id: user.id,
                password_type,
                payload,
                expires_at: Utc::now() + self.secret_ttl,
                created_by: admin.as_str().to_string(),
            },
        )
        .await?;

        tx.commit().await?;
        Ok((user, record))
    }

    /// Ensure `group_cn` exists in the directory and the mirror, then join it.
    async fn join_group(&self, user: &DirectoryUser, group_cn: &str) -> LifecycleResult<()> {
        match self.directory.create_group(group_cn, None).await {
            Ok(()) => info!(group = %group_cn, "Group created in directory"),
            Err(DirectoryError::AlreadyExists { .. }) => {}
            Err(e) => return Err(e.into()),
        }
        self.directory.add_user_to_group(&user.uid, group_cn).await?;

        self.record_membership(&user.uid, group_cn)
            .await
            .map_err(|e| LifecycleError::local_write("add_to_group", &user.uid, e))
    }

    async fn record_membership(&self, uid: &str, group_cn: &str) -> Result<(), DbError> {
        let mut tx = self.db.begin().await?;
        let user = DirectoryUser::ensure(&mut *tx, uid).await?;
        let group = match DirectoryGroup::find_by_cn(&mut *tx, group_cn).await? {
            Some(group) => group,
            None => {
                DirectoryGroup::upsert(
                    &mut *tx,
                    &UpsertDirectoryGroup {
                        cn: group_cn.to_string(),
                        ..Default::default()
                    },
                )
                .await?
            }
        };
        DirectoryUserGroup::add(&mut *tx, user.id, group.id).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn forget_membership(&self, uid: &str, group_cn: &str) -> Result<(), DbError> {
        let user = DirectoryUser::find_by_uid(self.db.inner(), uid).await?;
        let group = DirectoryGroup::find_by_cn(self.db.inner(), group_cn).await?;
        if let (Some(user), Some(group)) = (user, group) {
            DirectoryUserGroup::remove(self.db.inner(), user.id, group.id).await?;
        }
        Ok(())
    }

    async fn apply_local_update(
        &self,
        uid: &str,
        changes: &DirectoryUserChanges,
    ) -> Result<DirectoryUser, DbError> {
        let mut tx = self.db.begin().await?;
        DirectoryUser::ensure(&mut *tx, uid).await?;
        let user = DirectoryUser::update(&mut *tx, uid, changes)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("directory user {uid}")))?;
        tx.commit().await?;
        Ok(user)
    }

    /// Send `secret` to the user's mobile and mark the record delivered on
    /// success. Never fails; problems are reported in the outcome.
    async fn deliver(&self, user: &DirectoryUser, issued_secret_id: i64, secret: &SecretValue) -> DeliveryOutcome {
        let Some(dispatcher) = &self.dispatcher else {
            return DeliveryOutcome::Skipped {
                reason: "SMS delivery is not configured".to_string(),
            };
        };
        let Some(mobile) = mobile_of(user) else {
            return DeliveryOutcome::Skipped {
                reason: "no mobile number".to_string(),
            };
        };

        let full_name = user.full_name();
        let notice = SecretNotice {
            recipient: mobile,
            username: &user.uid,
            full_name: &full_name,
            secret,
        };
        let dispatch = match dispatcher.send_secret(&notice).await {
            Ok(dispatch) => dispatch,
            Err(e) => {
                warn!(uid = %user.uid, error = %e, "SMS dispatch could not be recorded");
                return DeliveryOutcome::Failed {
                    error: e.to_string(),
                    log_id: None,
                };
            }
        };

        if !dispatch.report.success {
            return DeliveryOutcome::Failed {
                error: dispatch
                    .report
                    .error
                    .unwrap_or_else(|| "Unknown error".to_string()),
                log_id: Some(dispatch.log.id),
            };
        }

        if let Err(e) = UserPassword::mark_sent(self.db.inner(), issued_secret_id).await {
            warn!(id = issued_secret_id, error = %e, "Failed to mark secret as delivered");
        }
        DeliveryOutcome::Sent {
            message_id: dispatch.report.message_id,
            log_id: Some(dispatch.log.id),
        }
    }
}

fn mobile_of(user: &DirectoryUser) -> Option<&str> {
    user.mobile.as_deref().map(str::trim).filter(|m| !m.is_empty())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn to_payload(sealed: SealedSecret) -> EncryptedPayload {
    EncryptedPayload {
        kdf_params: sealed.kdf.to_string(),
        ciphertext: sealed.ciphertext,
        wrapped_dek: sealed.wrapped_dek,
        kdf_salt: sealed.salt,
    }
}

fn to_sealed(payload: &EncryptedPayload) -> Result<SealedSecret, VaultError> {
    Ok(SealedSecret {
        ciphertext: payload.ciphertext.clone(),
        wrapped_dek: payload.wrapped_dek.clone(),
        salt: payload.kdf_salt.clone(),
        kdf: payload.kdf_params.parse()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirgate_secrets::KdfParams;

    #[test]
    fn test_payload_conversion_roundtrip() {
        let vault = EnvelopeVault::new("master").with_kdf(KdfParams {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        });
        let sealed = vault.seal("secret").unwrap();
        let payload = to_payload(sealed.clone());
        assert_eq!(payload.kdf_params, "argon2id$m=64,t=1,p=1");
        assert_eq!(to_sealed(&payload).unwrap(), sealed);
    }

    #[test]
    fn test_bad_kdf_descriptor() {
        let payload = EncryptedPayload {
            ciphertext: "c".to_string(),
            wrapped_dek: "w".to_string(),
            kdf_salt: "s".to_string(),
            kdf_params: "bogus".to_string(),
        };
        assert!(matches!(to_sealed(&payload), Err(VaultError::InvalidParams { .. })));
    }
}
