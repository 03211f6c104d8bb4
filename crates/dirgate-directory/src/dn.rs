//! Distinguished name construction and LDAP value encoding.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

/// Generalized time layout used by Kerberos attributes.
const GENERALIZED_TIME_FORMAT: &str = "%Y%m%d%H%M%SZ";

/// Far-future `krbPasswordExpiration` written after an admin password set.
pub const PASSWORD_EXPIRATION_SENTINEL: &str = "20380119031407Z";

/// DN of a user entry.
#[must_use]
pub fn user_dn(uid: &str, base_dn: &str) -> String {
    format!(
        "uid={},cn=users,cn=accounts,{}",
        escape_dn_value(uid),
        base_dn
    )
}

/// DN of a group entry.
#[must_use]
pub fn group_dn(cn: &str, base_dn: &str) -> String {
    format!(
        "cn={},cn=groups,cn=accounts,{}",
        escape_dn_value(cn),
        base_dn
    )
}

/// Kerberos realm for a base DN: `dc=example,dc=com` becomes `EXAMPLE.COM`.
#[must_use]
pub fn realm_from_base_dn(base_dn: &str) -> String {
    base_dn
        .split(',')
        .filter_map(|rdn| {
            let (attr, value) = rdn.trim().split_once('=')?;
            attr.trim()
                .eq_ignore_ascii_case("dc")
                .then(|| value.trim().to_uppercase())
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// First RDN value of a DN (`uid=jdoe,cn=users,...` gives `jdoe`).
#[must_use]
pub fn rdn_value(dn: &str) -> Option<&str> {
    let first = dn.split(',').next()?;
    first.split_once('=').map(|(_, v)| v.trim())
}

/// Format a timestamp as LDAP generalized time.
#[must_use]
pub fn format_generalized_time(at: DateTime<Utc>) -> String {
    at.format(GENERALIZED_TIME_FORMAT).to_string()
}

/// Parse LDAP generalized time (`YYYYMMDDHHMMSSZ`).
#[must_use]
pub fn parse_generalized_time(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, GENERALIZED_TIME_FORMAT)
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Escape special characters in LDAP filter values (RFC 4515).
#[must_use]
pub fn escape_filter_value(value: &str) -> String {
    value
        .replace('\\', "\\5c")
        .replace('*', "\\2a")
        .replace('(', "\\28")
        .replace(')', "\\29")
        .replace('\0', "\\00")
}

/// Escape special characters in DN attribute values per RFC 4514.
///
/// - Leading or trailing SPACE becomes `\20`
/// - Leading `#` becomes `\23`
/// - `, + " \ < > ; =` get a backslash prefix
/// - NUL becomes `\00`
#[must_use]
pub fn escape_dn_value(value: &str) -> String {
    let count = value.chars().count();
    let mut result = String::with_capacity(value.len() * 2);

    for (i, ch) in value.chars().enumerate() {
        let is_first = i == 0;
        let is_last = i + 1 == count;

        match ch {
            ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=' => {
                result.push('\\');
                result.push(ch);
            }
            '\0' => result.push_str("\\00"),
            ' ' if is_first || is_last => result.push_str("\\20"),
            '#' if is_first => result.push_str("\\23"),
            _ => result.push(ch),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_dn() {
        assert_eq!(
            user_dn("jdoe", "dc=example,dc=com"),
            "uid=jdoe,cn=users,cn=accounts,dc=example,dc=com"
        );
    }

    #[test]
    fn test_group_dn() {
        assert_eq!(
            group_dn("developers", "dc=mci,dc=local"),
            "cn=developers,cn=groups,cn=accounts,dc=mci,dc=local"
        );
    }

    #[test]
    fn test_dn_injection_is_escaped() {
        assert_eq!(
            user_dn("evil,cn=admins", "dc=example,dc=com"),
            "uid=evil\\,cn\\=admins,cn=users,cn=accounts,dc=example,dc=com"
        );
    }

    #[test]
    fn test_realm_from_base_dn() {
        assert_eq!(realm_from_base_dn("dc=example,dc=com"), "EXAMPLE.COM");
        assert_eq!(realm_from_base_dn("DC=mci, DC=local"), "MCI.LOCAL");
        assert_eq!(realm_from_base_dn("ou=people,dc=corp,dc=io"), "CORP.IO");
    }

    #[test]
    fn test_rdn_value() {
        assert_eq!(
            rdn_value("uid=alice,cn=users,cn=accounts,dc=x"),
            Some("alice")
        );
        assert_eq!(rdn_value("garbage"), None);
    }

    #[test]
    fn test_generalized_time() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 8, 30, 0).single();
        let Some(at) = at else {
            panic!("valid timestamp");
        };
        assert_eq!(format_generalized_time(at), "20260301083000Z");
        assert_eq!(parse_generalized_time("20260301083000Z"), Some(at));
        assert!(parse_generalized_time("not-a-time").is_none());
        assert!(parse_generalized_time(PASSWORD_EXPIRATION_SENTINEL).is_some());
    }

    #[test]
    fn test_escape_filter_value() {
        assert_eq!(escape_filter_value("a*b"), "a\\2ab");
        assert_eq!(escape_filter_value("(x)"), "\\28x\\29");
        assert_eq!(escape_filter_value("c\\d"), "c\\5cd");
    }

    #[test]
    fn test_escape_dn_value_leading_trailing_space() {
        assert_eq!(escape_dn_value(" a "), "\\20a\\20");
        assert_eq!(escape_dn_value("#x"), "\\23x");
        assert_eq!(escape_dn_value(""), "");
    }

    #[test]
    fn test_escape_dn_value_multibyte_trailing_space() {
        assert_eq!(escape_dn_value("é "), "é\\20");
    }
}
