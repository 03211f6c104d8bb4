//! # dirgate directory gateway
//!
//! Protocol-level access to a FreeIPA-style LDAP directory: user and group
//! lifecycle, membership, password-modify with best-effort policy
//! post-steps, account state, and Kerberos principal expiration.
//!
//! ## Example
//!
//! ```rust,ignore
//! use dirgate_directory::{build_directory, DirectorySettings, NewDirectoryUser};
//!
//! let settings = DirectorySettings::new("ipa.example.com", "dc=example,dc=com", "uid=admin,cn=users,cn=accounts,dc=example,dc=com")
//!     .with_password("secret");
//! let directory = build_directory(&settings)?;
//! directory.create_user(&NewDirectoryUser { uid: "jdoe".into(), ..Default::default() }, "Initial#Pass1").await?;
//! ```

pub mod client;
pub mod config;
pub mod dn;
pub mod entry;
pub mod error;
pub mod factory;
pub mod ldap;
pub mod memory;

pub use client::{DirectoryClient, PasswordPostStep};
pub use config::{DirectoryBackend, DirectorySettings};
pub use entry::{DirectoryGroupEntry, DirectoryUserEntry, NewDirectoryUser, UserChanges};
pub use error::{DirectoryError, DirectoryResult};
pub use factory::build_directory;
pub use ldap::LdapDirectory;
pub use memory::{DirectoryOp, InMemoryDirectory};
