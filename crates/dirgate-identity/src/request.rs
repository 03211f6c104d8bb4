//! Lifecycle inputs.

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LifecycleError, LifecycleResult};

/// Administrator performing a write, recorded on issued secrets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AdminId(String);

impl AdminId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AdminId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Provisioning request.
#[derive(Clone, Default, Deserialize)]
pub struct CreateUserRequest {
    pub uid: String,
    pub cn: String,
    pub sn: String,
    pub given_name: String,
    pub mail: String,
    pub mobile: Option<String>,
    /// Groups to join; missing ones are created.
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub send_sms: bool,
    /// Explicit initial secret; generated when absent.
    pub password: Option<String>,
}

impl std::fmt::Debug for CreateUserRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateUserRequest")
            .field("uid", &self.uid)
            .field("cn", &self.cn)
            .field("mail", &self.mail)
            .field("mobile", &self.mobile)
            .field("groups", &self.groups)
            .field("send_sms", &self.send_sms)
            .field("password", &self.password.as_ref().map(|_| "***REDACTED***"))
            .finish_non_exhaustive()
    }
}

impl CreateUserRequest {
    pub(crate) fn validate(&self) -> LifecycleResult<()> {
        validate_uid(&self.uid)?;
        if self.groups.iter().any(|g| g.trim().is_empty()) {
            return Err(LifecycleError::Validation("group name must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Attribute edit. `None` leaves the attribute unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub cn: Option<String>,
    pub sn: Option<String>,
    pub given_name: Option<String>,
    pub mail: Option<String>,
    pub mobile: Option<String>,
}

/// Generalized time carries a four-digit year.
const MAX_EXPIRATION_YEAR: i32 = 9999;

/// Change to a Kerberos principal's expiration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpirationChange {
    /// Expire at an absolute time.
    At(DateTime<Utc>),
    /// Expire relative to now.
    In { days: i64, hours: i64 },
    /// Never expire.
    Clear,
}

impl ExpirationChange {
    /// Resolve to an absolute time relative to `now`.
    pub fn resolve(&self, now: DateTime<Utc>) -> LifecycleResult<Option<DateTime<Utc>>> {
        match *self {
            ExpirationChange::At(at) if at.year() > MAX_EXPIRATION_YEAR => Err(
                LifecycleError::Validation(format!("expiration year must not exceed {MAX_EXPIRATION_YEAR}")),
            ),
            ExpirationChange::At(at) => Ok(Some(at)),
            ExpirationChange::In { days, hours } => {
                if days < 0 || hours < 0 || (days == 0 && hours == 0) {
                    return Err(LifecycleError::Validation(
                        "expiration offset must be positive".to_string(),
                    ));
                }
                let offset = Duration::try_days(days)
                    .zip(Duration::try_hours(hours))
                    .and_then(|(d, h)| d.checked_add(&h));
                let at = offset
                    .and_then(|offset| now.checked_add_signed(offset))
                    .filter(|at| at.year() <= MAX_EXPIRATION_YEAR)
                    .ok_or_else(|| {
                        LifecycleError::Validation("expiration offset is too large".to_string())
                    })?;
                Ok(Some(at))
            }
            ExpirationChange::Clear => Ok(None),
        }
    }
}

pub(crate) fn validate_uid(uid: &str) -> LifecycleResult<()> {
    if uid.trim().is_empty() {
        return Err(LifecycleError::Validation("uid must not be empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiration_resolve() {
        let now = Utc::now();
        assert_eq!(
            ExpirationChange::In { days: 1, hours: 2 }.resolve(now).unwrap(),
            Some(now + Duration::hours(26))
        );
        assert_eq!(ExpirationChange::Clear.resolve(now).unwrap(), None);
        assert_eq!(ExpirationChange::At(now).resolve(now).unwrap(), Some(now));
        assert!(ExpirationChange::In { days: 0, hours: 0 }.resolve(now).is_err());
        assert!(ExpirationChange::In { days: -1, hours: 0 }.resolve(now).is_err());
    }

    #[test]
    fn test_expiration_overflow_is_rejected() {
        let now = Utc::now();
        for change in [
            ExpirationChange::In { days: 100_000_000, hours: 0 },
            ExpirationChange::In { days: 0, hours: i64::MAX },
            ExpirationChange::In { days: i64::MAX, hours: i64::MAX },
            ExpirationChange::In { days: 3_000_000, hours: 0 },
        ] {
            assert!(matches!(
                change.resolve(now),
                Err(LifecycleError::Validation(_))
            ));
        }
        assert!(ExpirationChange::In { days: 36_500, hours: 0 }.resolve(now).is_ok());
    }

    #[test]
    fn test_request_debug_redacts_password() {
        let request = CreateUserRequest {
            uid: "alice".to_string(),
            password: Some("Sup3r#Secret".to_string()),
            ..Default::default()
        };
        assert!(!format!("{request:?}").contains("Sup3r#Secret"));
    }

    #[test]
    fn test_validate() {
        assert!(CreateUserRequest::default().validate().is_err());
        let request = CreateUserRequest {
            uid: "alice".to_string(),
            groups: vec!["devs".to_string(), " ".to_string()],
            ..Default::default()
        };
        assert!(request.validate().is_err());
    }
}
