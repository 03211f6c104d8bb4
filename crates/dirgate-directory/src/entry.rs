//! Typed directory entries.
//!
//! Search results are mapped into these structs once, at the gateway
//! boundary; absent attributes become `None`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dn;

/// Attributes requested when reading user entries.
pub const USER_ATTRIBUTES: &[&str] = &[
    "uid",
    "cn",
    "sn",
    "givenName",
    "mail",
    "mobile",
    "nsAccountLock",
    "krbPrincipalExpiration",
    "krbLoginFailedCount",
];

/// Attributes requested when reading group entries.
pub const GROUP_ATTRIBUTES: &[&str] = &["cn", "description", "gidNumber", "member"];

/// A user to be added to the directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewDirectoryUser {
    pub uid: String,
    pub cn: String,
    pub sn: String,
    pub given_name: String,
    pub mail: String,
    pub mobile: Option<String>,
}

/// Attribute changes for an existing user. `None` fields are left untouched.
#[derive(Clone, Default)]
pub struct UserChanges {
    pub mail: Option<String>,
    pub mobile: Option<String>,
    pub cn: Option<String>,
    pub sn: Option<String>,
    pub given_name: Option<String>,
    /// Applied through the password-modify extended operation.
    pub password: Option<String>,
}

impl std::fmt::Debug for UserChanges {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserChanges")
            .field("mail", &self.mail)
            .field("mobile", &self.mobile)
            .field("cn", &self.cn)
            .field("sn", &self.sn)
            .field("given_name", &self.given_name)
            .field("password", &self.password.as_ref().map(|_| "***REDACTED***"))
            .finish()
    }
}

impl UserChanges {
    /// Non-empty attribute replacements as `(ldap attribute, value)` pairs.
    #[must_use]
    pub fn attribute_replacements(&self) -> Vec<(&'static str, String)> {
        [
            ("mail", &self.mail),
            ("mobile", &self.mobile),
            ("cn", &self.cn),
            ("sn", &self.sn),
            ("givenName", &self.given_name),
        ]
        .into_iter()
        .filter_map(|(attr, value)| match value {
            Some(v) if !v.is_empty() => Some((attr, v.clone())),
            _ => None,
        })
        .collect()
    }

    /// Non-empty password, if one is part of the change set.
    #[must_use]
    pub fn new_password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }

    /// Whether applying these changes would touch the directory at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attribute_replacements().is_empty() && self.new_password().is_none()
    }
}

/// A user entry as read from the directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryUserEntry {
    pub dn: String,
    pub uid: String,
    pub cn: Option<String>,
    pub sn: Option<String>,
    pub given_name: Option<String>,
    pub mail: Option<String>,
    pub mobile: Option<String>,
    /// `nsAccountLock`; `None` when the attribute is absent.
    pub account_locked: Option<bool>,
    pub principal_expiration: Option<DateTime<Utc>>,
    pub login_failed_count: Option<u32>,
}

impl DirectoryUserEntry {
    /// Build from a DN and a raw attribute map.
    #[must_use]
    pub fn from_attrs(dn_value: String, attrs: &HashMap<String, Vec<String>>) -> Self {
        let uid = first(attrs, "uid")
            .or_else(|| dn::rdn_value(&dn_value).map(str::to_string))
            .unwrap_or_default();

        Self {
            uid,
            cn: first(attrs, "cn"),
            sn: first(attrs, "sn"),
            given_name: first(attrs, "givenName"),
            mail: first(attrs, "mail"),
            mobile: first(attrs, "mobile"),
            account_locked: first(attrs, "nsAccountLock").map(|v| v.eq_ignore_ascii_case("true")),
            principal_expiration: first(attrs, "krbPrincipalExpiration")
                .and_then(|v| dn::parse_generalized_time(&v)),
            login_failed_count: first(attrs, "krbLoginFailedCount").and_then(|v| v.parse().ok()),
            dn: dn_value,
        }
    }

    /// Display name: cn, else given name plus surname, else uid.
    #[must_use]
    pub fn display_name(&self) -> String {
        if let Some(cn) = self.cn.as_deref().filter(|c| !c.is_empty()) {
            return cn.to_string();
        }
        let joined = [self.given_name.as_deref(), self.sn.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        if joined.is_empty() {
            self.uid.clone()
        } else {
            joined
        }
    }
}

/// A group entry as read from the directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryGroupEntry {
    pub dn: String,
    pub cn: String,
    pub description: Option<String>,
    pub gid_number: Option<i64>,
    /// Member DNs.
    pub members: Vec<String>,
}

impl DirectoryGroupEntry {
    /// Build from a DN and a raw attribute map.
    #[must_use]
    pub fn from_attrs(dn_value: String, attrs: &HashMap<String, Vec<String>>) -> Self {
        let cn = first(attrs, "cn")
            .or_else(|| dn::rdn_value(&dn_value).map(str::to_string))
            .unwrap_or_default();

        Self {
            cn,
            description: first(attrs, "description"),
            gid_number: first(attrs, "gidNumber").and_then(|v| v.parse().ok()),
            members: lookup(attrs, "member").cloned().unwrap_or_default(),
            dn: dn_value,
        }
    }
}

/// Case-insensitive attribute lookup; LDAP attribute names are not case sensitive.
fn lookup<'a>(attrs: &'a HashMap<String, Vec<String>>, name: &str) -> Option<&'a Vec<String>> {
    attrs.get(name).or_else(|| {
        attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    })
}

fn first(attrs: &HashMap<String, Vec<String>>, name: &str) -> Option<String> {
    lookup(attrs, name).and_then(|values| values.first().cloned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &[&str])]) -> HashMap<String, Vec<String>> {
        pairs
            .iter()
            .map(|(k, vs)| (k.to_string(), vs.iter().map(|v| v.to_string()).collect()))
            .collect()
    }

    #[test]
    fn test_user_entry_from_attrs() {
        let raw = attrs(&[
            ("uid", &["alice"]),
            ("cn", &["Alice Liddell"]),
            ("mail", &["alice@x.com"]),
            ("nsaccountlock", &["TRUE"]),
            ("krbPrincipalExpiration", &["20300101000000Z"]),
            ("krbLoginFailedCount", &["3"]),
        ]);
        let entry = DirectoryUserEntry::from_attrs(
            "uid=alice,cn=users,cn=accounts,dc=x".to_string(),
            &raw,
        );

        assert_eq!(entry.uid, "alice");
        assert_eq!(entry.cn.as_deref(), Some("Alice Liddell"));
        assert_eq!(entry.mobile, None);
        assert_eq!(entry.account_locked, Some(true));
        assert!(entry.principal_expiration.is_some());
        assert_eq!(entry.login_failed_count, Some(3));
    }

    #[test]
    fn test_user_entry_missing_uid_falls_back_to_dn() {
        let entry = DirectoryUserEntry::from_attrs(
            "uid=bob,cn=users,cn=accounts,dc=x".to_string(),
            &HashMap::new(),
        );
        assert_eq!(entry.uid, "bob");
        assert_eq!(entry.account_locked, None);
        assert_eq!(entry.display_name(), "bob");
    }

    #[test]
    fn test_group_entry_from_attrs() {
        let raw = attrs(&[
            ("cn", &["devs"]),
            ("gidNumber", &["20001"]),
            ("member", &["uid=a,cn=users", "uid=b,cn=users"]),
        ]);
        let entry = DirectoryGroupEntry::from_attrs("cn=devs,cn=groups".to_string(), &raw);
        assert_eq!(entry.cn, "devs");
        assert_eq!(entry.gid_number, Some(20001));
        assert_eq!(entry.members.len(), 2);
        assert_eq!(entry.description, None);
    }

    #[test]
    fn test_changes_skip_empty_values() {
        let changes = UserChanges {
            mail: Some("new@x.com".to_string()),
            mobile: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(
            changes.attribute_replacements(),
            vec![("mail", "new@x.com".to_string())]
        );
        assert!(!changes.is_empty());
        assert!(UserChanges::default().is_empty());
    }

    #[test]
    fn test_changes_debug_redacts_password() {
        let changes = UserChanges {
            password: Some("Hunter2!Hunter2".to_string()),
            ..Default::default()
        };
        assert!(!format!("{changes:?}").contains("Hunter2"));
    }
}
