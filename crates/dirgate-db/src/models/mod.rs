//! Database models for the local mirror and audit tables.

pub mod directory_group;
pub mod directory_server_config;
pub mod directory_user;
pub mod directory_user_group;
pub mod notification_log;
pub mod notification_template;
pub mod user_password;

pub use directory_group::{DirectoryGroup, UpsertDirectoryGroup};
pub use directory_server_config::{DirectoryServerConfig, NewDirectoryServerConfig};
pub use directory_user::{DirectoryUser, DirectoryUserChanges, UpsertDirectoryUser};
pub use directory_user_group::DirectoryUserGroup;
pub use notification_log::{NewNotificationLog, NotificationLog, NotificationStatus};
pub use notification_template::{NewNotificationTemplate, NotificationTemplate};
pub use user_password::{EncryptedPayload, NewUserPassword, PasswordType, UserPassword};
