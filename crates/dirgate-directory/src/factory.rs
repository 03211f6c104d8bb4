//! Backend selection.
//!
//! The directory implementation is picked once, from configuration, and
//! handed to callers as a trait object.

use std::sync::Arc;

use tracing::info;

use crate::client::DirectoryClient;
use crate::config::{DirectoryBackend, DirectorySettings};
use crate::error::DirectoryResult;
use crate::ldap::LdapDirectory;
use crate::memory::InMemoryDirectory;

/// Build the configured directory client.
pub fn build_directory(settings: &DirectorySettings) -> DirectoryResult<Arc<dyn DirectoryClient>> {
    settings.validate()?;

    let client: Arc<dyn DirectoryClient> = match settings.backend {
        DirectoryBackend::Ldap => Arc::new(LdapDirectory::new(settings.clone())?),
        DirectoryBackend::Memory => Arc::new(InMemoryDirectory::from_settings(settings)),
    };

    info!(
        backend = client.backend_name(),
        base_dn = %settings.base_dn,
        "Directory client initialized"
    );
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_memory_backend() {
        let settings = DirectorySettings::new("", "dc=example,dc=com", "")
            .with_backend(DirectoryBackend::Memory);
        let client = build_directory(&settings).unwrap();
        assert_eq!(client.backend_name(), "memory");
        assert_eq!(client.base_dn(), "dc=example,dc=com");
    }

    #[test]
    fn test_build_ldap_backend() {
        let settings = DirectorySettings::new("ipa.example.com", "dc=example,dc=com", "uid=admin");
        let client = build_directory(&settings).unwrap();
        assert_eq!(client.backend_name(), "ldap");
    }

    #[test]
    fn test_build_rejects_invalid_settings() {
        let settings = DirectorySettings::new("", "dc=example,dc=com", "uid=admin");
        assert!(build_directory(&settings).is_err());
    }
}
