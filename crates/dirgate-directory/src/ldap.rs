//! LDAP gateway implementation
//!
//! Implements `DirectoryClient` against a FreeIPA-style directory using ldap3.
//! Connections are never cached: each operation opens a session, binds,
//! does its work, and unbinds on every exit path.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ldap3::exop::PasswordModify;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Mod, Scope, SearchEntry};
use tracing::{debug, info, instrument, warn};

use crate::client::{DirectoryClient, PasswordPostStep};
use crate::config::DirectorySettings;
use crate::dn;
use crate::entry::{
    DirectoryGroupEntry, DirectoryUserEntry, NewDirectoryUser, UserChanges, GROUP_ATTRIBUTES,
    USER_ATTRIBUTES,
};
use crate::error::{
    DirectoryError, DirectoryResult, RC_ATTRIBUTE_OR_VALUE_EXISTS, RC_INVALID_CREDENTIALS,
    RC_NO_SUCH_ATTRIBUTE,
};

/// Object classes of a FreeIPA user entry.
const USER_OBJECT_CLASSES: &[&str] = &[
    "top",
    "person",
    "organizationalPerson",
    "inetOrgPerson",
    "inetUser",
    "posixAccount",
    "krbPrincipalAux",
];

/// Object classes of a FreeIPA group entry.
const GROUP_OBJECT_CLASSES: &[&str] = &["top", "groupOfNames", "posixGroup"];

/// Directory gateway speaking LDAP v3.
pub struct LdapDirectory {
    settings: DirectorySettings,
}

impl LdapDirectory {
    /// Create a gateway with the given settings.
    pub fn new(settings: DirectorySettings) -> DirectoryResult<Self> {
        settings.validate()?;
        Ok(Self { settings })
    }

    /// Settings in use.
    #[must_use]
    pub fn settings(&self) -> &DirectorySettings {
        &self.settings
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.settings.timeout_secs)
    }

    /// Open a transport without binding.
    async fn connect(&self) -> DirectoryResult<Ldap> {
        let url = self.settings.url();

        debug!(url = %url, "Connecting to directory");

        let conn_settings = LdapConnSettings::new()
            .set_conn_timeout(self.timeout())
            .set_starttls(self.settings.use_starttls);

        let (conn, ldap) = LdapConnAsync::with_settings(conn_settings, &url)
            .await
            .map_err(|e| {
                DirectoryError::connect_failed_with_source(
                    format!("Failed to connect to directory at {url}"),
                    e,
                )
            })?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection driver error");
            }
        });

        Ok(ldap)
    }

    /// Open a transport and bind with the service identity.
    async fn open(&self) -> DirectoryResult<Ldap> {
        let mut ldap = self.connect().await?;
        let bind_dn = &self.settings.bind_dn;
        let bind_password = self.settings.bind_password.as_deref().unwrap_or("");

        debug!(bind_dn = %bind_dn, "Performing LDAP bind");

        let bound = ldap
            .with_timeout(self.timeout())
            .simple_bind(bind_dn, bind_password)
            .await;

        let result = match bound {
            Ok(result) => result,
            Err(e) => {
                close(ldap).await;
                return Err(DirectoryError::connect_failed_with_source(
                    format!("LDAP bind failed for {bind_dn}"),
                    e,
                ));
            }
        };

        if result.rc != 0 {
            close(ldap).await;
            if result.rc == RC_INVALID_CREDENTIALS {
                return Err(DirectoryError::AuthenticationFailed);
            }
            return Err(DirectoryError::connect_failed(format!(
                "LDAP bind failed with code {}: {}",
                result.rc, result.text
            )));
        }

        Ok(ldap)
    }

    /// Apply `mods` to `dn`, mapping result codes. `tolerated` codes count as success.
    async fn modify(
        &self,
        ldap: &mut Ldap,
        dn: &str,
        mods: Vec<Mod<String>>,
        tolerated: &[u32],
    ) -> DirectoryResult<()> {
        let result = ldap
            .with_timeout(self.timeout())
            .modify(dn, mods)
            .await
            .map_err(|e| {
                DirectoryError::operation_failed_with_source(
                    format!("Failed to modify entry: {dn}"),
                    e,
                )
            })?;

        if result.rc == 0 || tolerated.contains(&result.rc) {
            return Ok(());
        }

        Err(DirectoryError::from_result_code(
            result.rc,
            &result.text,
            "modify",
            dn,
        ))
    }

    async fn search(
        &self,
        ldap: &mut Ldap,
        base: &str,
        filter: &str,
        attrs: &[&str],
    ) -> DirectoryResult<Vec<SearchEntry>> {
        debug!(base = %base, filter = %filter, "Searching directory");

        let result = ldap
            .with_timeout(self.timeout())
            .search(base, Scope::Subtree, filter, attrs.to_vec())
            .await
            .map_err(|e| DirectoryError::operation_failed_with_source("LDAP search failed", e))?;

        let (entries, _) = result
            .success()
            .map_err(|e| DirectoryError::operation_failed_with_source("LDAP search failed", e))?;

        Ok(entries.into_iter().map(SearchEntry::construct).collect())
    }

    /// Open a session, modify the user entry, close.
    async fn modify_user(
        &self,
        uid: &str,
        mods: Vec<Mod<String>>,
        tolerated: &[u32],
    ) -> DirectoryResult<()> {
        let dn = self.settings.user_dn(uid);
        let mut ldap = self.open().await?;
        let result = self.modify(&mut ldap, &dn, mods, tolerated).await;
        close(ldap).await;
        result
    }

    async fn add_user(
        &self,
        ldap: &mut Ldap,
        user: &NewDirectoryUser,
        password: &str,
    ) -> DirectoryResult<String> {
        let dn = self.settings.user_dn(&user.uid);
        let attrs = user_add_attrs(&self.settings, user, password);

        debug!(dn = %dn, "Creating directory user");

        let result = ldap
            .with_timeout(self.timeout())
            .add(&dn, attrs)
            .await
            .map_err(|e| {
                DirectoryError::operation_failed_with_source(
                    format!("Failed to create entry: {dn}"),
                    e,
                )
            })?;

        if result.rc != 0 {
            return Err(DirectoryError::from_result_code(
                result.rc,
                &result.text,
                "add",
                &dn,
            ));
        }

        Ok(dn)
    }

    async fn password_modify(
        &self,
        ldap: &mut Ldap,
        dn: &str,
        new_password: &str,
        old_password: Option<&str>,
    ) -> DirectoryResult<()> {
        let exop = PasswordModify {
            user_id: Some(dn),
            old_pass: old_password,
            new_pass: Some(new_password),
        };

        let exop_result = ldap
            .with_timeout(self.timeout())
            .extended(exop)
            .await
            .map_err(|e| {
                DirectoryError::operation_failed_with_source(
                    format!("Password modify failed for {dn}"),
                    e,
                )
            })?;
        let result = exop_result.1;

        if result.rc != 0 {
            return Err(DirectoryError::from_result_code(
                result.rc,
                &result.text,
                "password modify",
                dn,
            ));
        }

        Ok(())
    }

    async fn run_post_step(
        &self,
        ldap: &mut Ldap,
        dn: &str,
        step: PasswordPostStep,
    ) -> DirectoryResult<()> {
        self.modify(ldap, dn, post_step_mods(step), &[]).await
    }
}

/// Placeholder that FreeIPA's DNA plugin replaces with the next free id.
const DNA_MAGIC_ID: &str = "-1";

/// Attribute set of a new user entry.
fn user_add_attrs(
    settings: &DirectorySettings,
    user: &NewDirectoryUser,
    password: &str,
) -> Vec<(String, HashSet<String>)> {
    let single = |attr: &str, value: &str| (attr.to_string(), HashSet::from([value.to_string()]));

    let mut attrs = vec![
        (
            "objectClass".to_string(),
            USER_OBJECT_CLASSES.iter().map(|c| c.to_string()).collect(),
        ),
        single("uid", &user.uid),
        single("cn", &user.cn),
        single("sn", &user.sn),
        single("givenName", &user.given_name),
        single("mail", &user.mail),
        single("userPassword", password),
        single("loginShell", "/bin/bash"),
        single("homeDirectory", &format!("/home/{}", user.uid)),
        single("uidNumber", DNA_MAGIC_ID),
        single("gidNumber", DNA_MAGIC_ID),
        single(
            "krbPrincipalName",
            &format!("{}@{}", user.uid, settings.realm()),
        ),
    ];
    if let Some(mobile) = user.mobile.as_deref().filter(|m| !m.is_empty()) {
        attrs.push(single("mobile", mobile));
    }
    attrs
}

/// Modifications performed by a password post-step.
fn post_step_mods(step: PasswordPostStep) -> Vec<Mod<String>> {
    match step {
        PasswordPostStep::RelaxPolicy => vec![
            replace("krbPasswordExpiration", dn::PASSWORD_EXPIRATION_SENTINEL),
            replace("nsAccountLock", "FALSE"),
        ],
        PasswordPostStep::ClearLoginFailures => vec![clear("krbLoginFailedCount")],
    }
}

fn replace(attr: &str, value: &str) -> Mod<String> {
    Mod::Replace(attr.to_string(), HashSet::from([value.to_string()]))
}

/// Replace with no values: removes the attribute and succeeds when it is already absent.
fn clear(attr: &str) -> Mod<String> {
    Mod::Replace(attr.to_string(), HashSet::new())
}

async fn close(mut ldap: Ldap) {
    if let Err(e) = ldap.unbind().await {
        debug!(error = %e, "LDAP unbind failed");
    }
}

#[async_trait]
impl DirectoryClient for LdapDirectory {
    fn backend_name(&self) -> &'static str {
        "ldap"
    }

    fn base_dn(&self) -> &str {
        &self.settings.base_dn
    }

    #[instrument(skip(self), fields(host = %self.settings.host))]
    async fn test_connection(&self) -> DirectoryResult<()> {
        let mut ldap = self.open().await?;
        let result = ldap
            .with_timeout(self.timeout())
            .search(&self.settings.base_dn, Scope::Base, "(objectClass=*)", vec!["1.1"])
            .await
            .map_err(|e| DirectoryError::connect_failed_with_source("Base search failed", e))
            .and_then(|r| {
                r.success()
                    .map(|_| ())
                    .map_err(|e| DirectoryError::connect_failed_with_source("Base search failed", e))
            });
        close(ldap).await;

        if result.is_ok() {
            info!(host = %self.settings.host, "Directory connection test succeeded");
        }
        result
    }

    #[instrument(skip(self, password))]
    async fn authenticate(&self, uid: &str, password: &str) -> DirectoryResult<bool> {
        // An empty password would be an unauthenticated bind, which always succeeds.
        if password.is_empty() {
            return Ok(false);
        }

        let dn = self.settings.user_dn(uid);
        let mut ldap = self.connect().await?;
        let result = ldap
            .with_timeout(self.timeout())
            .simple_bind(&dn, password)
            .await;
        close(ldap).await;

        let result = result.map_err(|e| {
            DirectoryError::connect_failed_with_source(format!("LDAP bind failed for {dn}"), e)
        })?;

        match result.rc {
            0 => Ok(true),
            RC_INVALID_CREDENTIALS => Ok(false),
            rc => Err(DirectoryError::from_result_code(rc, &result.text, "bind", &dn)),
        }
    }

    #[instrument(skip(self, user, password), fields(uid = %user.uid))]
    async fn create_user(&self, user: &NewDirectoryUser, password: &str) -> DirectoryResult<()> {
        if user.uid.is_empty() {
            return Err(DirectoryError::invalid_input("uid is required"));
        }

        let mut ldap = self.open().await?;
        let result = self.add_user(&mut ldap, user, password).await;
        close(ldap).await;

        let dn = result?;
        info!(dn = %dn, "Directory user created");
        Ok(())
    }

    #[instrument(skip(self, changes))]
    async fn update_user(&self, uid: &str, changes: &UserChanges) -> DirectoryResult<()> {
        if changes.is_empty() {
            debug!(uid = %uid, "No changes to apply");
            return Ok(());
        }

        let dn = self.settings.user_dn(uid);
        let mods: Vec<Mod<String>> = changes
            .attribute_replacements()
            .into_iter()
            .map(|(attr, value)| replace(attr, &value))
            .collect();

        let mut ldap = self.open().await?;
        let mut result = Ok(());
        if !mods.is_empty() {
            result = self.modify(&mut ldap, &dn, mods, &[]).await;
        }
        if result.is_ok() {
            if let Some(password) = changes.new_password() {
                result = self.password_modify(&mut ldap, &dn, password, None).await;
            }
        }
        close(ldap).await;

        result?;
        info!(dn = %dn, "Directory user updated");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, uid: &str) -> DirectoryResult<()> {
        let dn = self.settings.user_dn(uid);
        let mut ldap = self.open().await?;
        let result = ldap
            .with_timeout(self.timeout())
            .delete(&dn)
            .await
            .map_err(|e| {
                DirectoryError::operation_failed_with_source(
                    format!("Failed to delete entry: {dn}"),
                    e,
                )
            });
        close(ldap).await;

        let result = result?;
        if result.rc != 0 {
            return Err(DirectoryError::from_result_code(
                result.rc,
                &result.text,
                "delete",
                &dn,
            ));
        }

        info!(dn = %dn, "Directory user deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_user(&self, uid: &str) -> DirectoryResult<Option<DirectoryUserEntry>> {
        let base = self.settings.users_container();
        let filter = format!("(uid={})", dn::escape_filter_value(uid));

        let mut ldap = self.open().await?;
        let result = self.search(&mut ldap, &base, &filter, USER_ATTRIBUTES).await;
        close(ldap).await;

        Ok(result?
            .into_iter()
            .next()
            .map(|entry| DirectoryUserEntry::from_attrs(entry.dn, &entry.attrs)))
    }

    #[instrument(skip(self))]
    async fn list_users(&self, limit: usize) -> DirectoryResult<Vec<DirectoryUserEntry>> {
        let base = self.settings.users_container();

        let mut ldap = self.open().await?;
        let result = self
            .search(&mut ldap, &base, "(objectClass=inetUser)", USER_ATTRIBUTES)
            .await;
        close(ldap).await;

        let users: Vec<DirectoryUserEntry> = result?
            .into_iter()
            .take(limit)
            .map(|entry| DirectoryUserEntry::from_attrs(entry.dn, &entry.attrs))
            .collect();

        info!(returned = users.len(), "Directory user search completed");
        Ok(users)
    }

    #[instrument(skip(self))]
    async fn create_group(&self, cn: &str, description: Option<&str>) -> DirectoryResult<()> {
        if cn.is_empty() {
            return Err(DirectoryError::invalid_input("group cn is required"));
        }

        let dn = self.settings.group_dn(cn);
        let mut attrs: Vec<(&str, HashSet<&str>)> = vec![
            ("objectClass", GROUP_OBJECT_CLASSES.iter().copied().collect()),
            ("cn", HashSet::from([cn])),
        ];
        if let Some(description) = description.filter(|d| !d.is_empty()) {
            attrs.push(("description", HashSet::from([description])));
        }

        let mut ldap = self.open().await?;
        let result = ldap
            .with_timeout(self.timeout())
            .add(&dn, attrs)
            .await
            .map_err(|e| {
                DirectoryError::operation_failed_with_source(
                    format!("Failed to create entry: {dn}"),
                    e,
                )
            });
        close(ldap).await;

        let result = result?;
        if result.rc != 0 {
            return Err(DirectoryError::from_result_code(
                result.rc,
                &result.text,
                "add",
                &dn,
            ));
        }

        info!(dn = %dn, "Directory group created");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_groups(&self) -> DirectoryResult<Vec<DirectoryGroupEntry>> {
        let base = self.settings.groups_container();

        let mut ldap = self.open().await?;
        let result = self
            .search(&mut ldap, &base, "(objectClass=groupOfNames)", GROUP_ATTRIBUTES)
            .await;
        close(ldap).await;

        Ok(result?
            .into_iter()
            .map(|entry| DirectoryGroupEntry::from_attrs(entry.dn, &entry.attrs))
            .collect())
    }

    #[instrument(skip(self))]
    async fn add_user_to_group(&self, uid: &str, group_cn: &str) -> DirectoryResult<()> {
        let group_dn = self.settings.group_dn(group_cn);
        let member = self.settings.user_dn(uid);
        let mods = vec![Mod::Add("member".to_string(), HashSet::from([member]))];

        let mut ldap = self.open().await?;
        let result = self
            .modify(&mut ldap, &group_dn, mods, &[RC_ATTRIBUTE_OR_VALUE_EXISTS])
            .await;
        close(ldap).await;

        result?;
        info!(uid = %uid, group = %group_cn, "User added to group");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove_user_from_group(&self, uid: &str, group_cn: &str) -> DirectoryResult<()> {
        let group_dn = self.settings.group_dn(group_cn);
        let member = self.settings.user_dn(uid);
        let mods = vec![Mod::Delete("member".to_string(), HashSet::from([member]))];

        let mut ldap = self.open().await?;
        let result = self
            .modify(&mut ldap, &group_dn, mods, &[RC_NO_SUCH_ATTRIBUTE])
            .await;
        close(ldap).await;

        result?;
        info!(uid = %uid, group = %group_cn, "User removed from group");
        Ok(())
    }

    #[instrument(skip(self, new_password, old_password))]
    async fn set_password(
        &self,
        uid: &str,
        new_password: &str,
        old_password: Option<&str>,
    ) -> DirectoryResult<()> {
        if new_password.is_empty() {
            return Err(DirectoryError::invalid_input("password must not be empty"));
        }

        let dn = self.settings.user_dn(uid);
        let mut ldap = self.open().await?;

        let result = self
            .password_modify(&mut ldap, &dn, new_password, old_password)
            .await;

        if result.is_ok() {
            info!(dn = %dn, "Password set via password-modify operation");
            for step in PasswordPostStep::ALL {
                if let Err(e) = self.run_post_step(&mut ldap, &dn, step).await {
                    warn!(dn = %dn, step = %step, error = %e, "Best-effort password post-step failed");
                }
            }
        }

        close(ldap).await;
        result
    }

    #[instrument(skip(self))]
    async fn relax_password_policy(&self, uid: &str) -> DirectoryResult<()> {
        let dn = self.settings.user_dn(uid);
        let mut ldap = self.open().await?;

        let mut result = Ok(());
        for step in PasswordPostStep::ALL {
            result = self.run_post_step(&mut ldap, &dn, step).await;
            if result.is_err() {
                break;
            }
        }
        close(ldap).await;

        result?;
        info!(dn = %dn, "Password policy relaxed");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn set_principal_expiration(
        &self,
        uid: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> DirectoryResult<()> {
        let modification = match expires_at {
            Some(at) => replace("krbPrincipalExpiration", &dn::format_generalized_time(at)),
            None => clear("krbPrincipalExpiration"),
        };

        self.modify_user(uid, vec![modification], &[]).await?;
        info!(uid = %uid, expires_at = ?expires_at, "Principal expiration updated");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn enable(&self, uid: &str) -> DirectoryResult<()> {
        self.modify_user(uid, vec![replace("nsAccountLock", "FALSE")], &[])
            .await?;
        info!(uid = %uid, "User enabled");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn disable(&self, uid: &str) -> DirectoryResult<()> {
        self.modify_user(uid, vec![replace("nsAccountLock", "TRUE")], &[])
            .await?;
        info!(uid = %uid, "User disabled");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn lock(&self, uid: &str) -> DirectoryResult<()> {
        let threshold = self.settings.lockout_threshold.to_string();
        self.modify_user(uid, vec![replace("krbLoginFailedCount", &threshold)], &[])
            .await?;
        info!(uid = %uid, "User locked");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn unlock(&self, uid: &str) -> DirectoryResult<()> {
        let now = dn::format_generalized_time(Utc::now());
        let mods = vec![
            clear("krbLoginFailedCount"),
            replace("krbLastAdminUnlock", &now),
        ];
        self.modify_user(uid, mods, &[]).await?;
        info!(uid = %uid, "User unlocked");
        Ok(())
    }
}

impl std::fmt::Debug for LdapDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapDirectory")
            .field("settings", &self.settings)
            .finish()
    }
}
