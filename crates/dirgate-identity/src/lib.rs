//! # dirgate-identity
//!
//! The [`IdentityLifecycleManager`] drives provisioning, password resets,
//! group membership, account state and reconciliation across the directory
//! gateway, the envelope vault, the local mirror and SMS delivery.
//!
//! ```rust,ignore
//! use dirgate_identity::{AdminId, CreateUserRequest, IdentityLifecycleManager};
//!
//! let manager = IdentityLifecycleManager::new(directory, pool, vault).with_dispatcher(dispatcher);
//! let outcome = manager
//!     .create_user(
//!         CreateUserRequest { uid: "alice".into(), mobile: Some("0912...".into()), send_sms: true, ..Default::default() },
//!         &AdminId::new("admin"),
//!     )
//!     .await?;
//! println!("{}", outcome.message);
//! ```

pub mod error;
pub mod manager;
pub mod outcome;
pub mod request;

pub use error::{ErrorKind, LifecycleError, LifecycleResult};
pub use manager::{IdentityLifecycleManager, DEFAULT_SECRET_TTL_DAYS, DEFAULT_SYNC_LIMIT};
pub use outcome::{
    ConnectionTest, CreatedUser, DeliveryOutcome, GroupFailure, GroupSyncSummary, LifecycleOutcome,
    PasswordChanged, PrincipalExpiration, SyncSummary,
};
pub use request::{AdminId, CreateUserRequest, ExpirationChange, UpdateUserRequest};
