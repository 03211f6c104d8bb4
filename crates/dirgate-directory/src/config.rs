//! Directory connection configuration
//!
//! Connection parameters for a FreeIPA-style directory server.

use serde::{Deserialize, Serialize};

use crate::dn;
use crate::error::{DirectoryError, DirectoryResult};

/// Which `DirectoryClient` implementation to build at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectoryBackend {
    /// Real LDAP server.
    #[default]
    Ldap,
    /// In-process directory for development and tests.
    Memory,
}

impl std::fmt::Display for DirectoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ldap => write!(f, "ldap"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

impl std::str::FromStr for DirectoryBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ldap" | "freeipa" => Ok(Self::Ldap),
            "memory" | "mock" => Ok(Self::Memory),
            _ => Err(format!("Invalid directory backend: {s}")),
        }
    }
}

/// Configuration for the directory gateway.
#[derive(Clone, Serialize, Deserialize)]
pub struct DirectorySettings {
    /// Backend implementation.
    #[serde(default)]
    pub backend: DirectoryBackend,

    /// Directory server hostname or IP address.
    pub host: String,

    /// Directory server port (389 for LDAP, 636 for LDAPS).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Use LDAPS.
    #[serde(default)]
    pub use_ssl: bool,

    /// Use STARTTLS upgrade on a plain connection.
    #[serde(default)]
    pub use_starttls: bool,

    /// Base DN (e.g., "dc=example,dc=com").
    pub base_dn: String,

    /// Bind DN (e.g., "uid=admin,cn=users,cn=accounts,dc=example,dc=com").
    pub bind_dn: String,

    /// Bind password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_password: Option<String>,

    /// Connect and per-operation timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// krbLoginFailedCount written by `lock`.
    #[serde(default = "default_lockout_threshold")]
    pub lockout_threshold: u32,
}

impl std::fmt::Debug for DirectorySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectorySettings")
            .field("backend", &self.backend)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("use_ssl", &self.use_ssl)
            .field("use_starttls", &self.use_starttls)
            .field("base_dn", &self.base_dn)
            .field("bind_dn", &self.bind_dn)
            .field(
                "bind_password",
                &self.bind_password.as_ref().map(|_| "***REDACTED***"),
            )
            .field("timeout_secs", &self.timeout_secs)
            .field("lockout_threshold", &self.lockout_threshold)
            .finish()
    }
}

fn default_port() -> u16 {
    389
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_lockout_threshold() -> u32 {
    6
}

impl DirectorySettings {
    /// Create settings with the required fields.
    pub fn new(
        host: impl Into<String>,
        base_dn: impl Into<String>,
        bind_dn: impl Into<String>,
    ) -> Self {
        Self {
            backend: DirectoryBackend::Ldap,
            host: host.into(),
            port: default_port(),
            use_ssl: false,
            use_starttls: false,
            base_dn: base_dn.into(),
            bind_dn: bind_dn.into(),
            bind_password: None,
            timeout_secs: default_timeout_secs(),
            lockout_threshold: default_lockout_threshold(),
        }
    }

    /// Set bind password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.bind_password = Some(password.into());
        self
    }

    /// Enable LDAPS.
    #[must_use]
    pub fn with_ssl(mut self) -> Self {
        self.use_ssl = true;
        self.port = 636;
        self
    }

    /// Set port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Select backend.
    #[must_use]
    pub fn with_backend(mut self, backend: DirectoryBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Get the LDAP URL.
    #[must_use]
    pub fn url(&self) -> String {
        let scheme = if self.use_ssl { "ldaps" } else { "ldap" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    /// Container holding user entries.
    #[must_use]
    pub fn users_container(&self) -> String {
        format!("cn=users,cn=accounts,{}", self.base_dn)
    }

    /// Container holding group entries.
    #[must_use]
    pub fn groups_container(&self) -> String {
        format!("cn=groups,cn=accounts,{}", self.base_dn)
    }

    /// DN of the user with `uid`.
    #[must_use]
    pub fn user_dn(&self, uid: &str) -> String {
        dn::user_dn(uid, &self.base_dn)
    }

    /// DN of the group with `cn`.
    #[must_use]
    pub fn group_dn(&self, cn: &str) -> String {
        dn::group_dn(cn, &self.base_dn)
    }

    /// Kerberos realm derived from the base DN.
    #[must_use]
    pub fn realm(&self) -> String {
        dn::realm_from_base_dn(&self.base_dn)
    }

    /// Check that the settings are usable.
    pub fn validate(&self) -> DirectoryResult<()> {
        if self.backend == DirectoryBackend::Memory {
            if self.base_dn.is_empty() {
                return Err(DirectoryError::invalid_input("base_dn is required"));
            }
            return Ok(());
        }

        if self.host.is_empty() {
            return Err(DirectoryError::invalid_input("host is required"));
        }

        if self.base_dn.is_empty() {
            return Err(DirectoryError::invalid_input("base_dn is required"));
        }

        if self.bind_dn.is_empty() {
            return Err(DirectoryError::invalid_input("bind_dn is required"));
        }

        if self.use_ssl && self.use_starttls {
            return Err(DirectoryError::invalid_input(
                "cannot use both SSL and STARTTLS",
            ));
        }

        Ok(())
    }
}
