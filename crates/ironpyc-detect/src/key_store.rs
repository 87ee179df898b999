//! Hierarchical key/value store capability (the Windows registry).
//!
//! Discovery only needs two reads: list a key's immediate children, and read a
//! key's default string value. Hosts without a registry get
//! [`UnavailableKeyStore`], which makes the registry probe fail cleanly so
//! discovery degrades to the PATH search.

/// Read-only view over a registry-like key hierarchy. Paths use `\` separators
/// and are relative to the store's root (HKLM for the system store).
pub trait KeyStore: Send + Sync {
    /// `false` when the host has no such store at all.
    fn is_available(&self) -> bool {
        true
    }

    /// Names of the immediate child keys, or `None` if `path` does not exist.
    fn subkeys(&self, path: &str) -> Option<Vec<String>>;

    /// The default (unnamed) string value of `path`, or `None` if missing.
    fn default_value(&self, path: &str) -> Option<String>;
}

/// Store for hosts without a registry.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableKeyStore;

impl KeyStore for UnavailableKeyStore {
    fn is_available(&self) -> bool {
        false
    }

    fn subkeys(&self, _path: &str) -> Option<Vec<String>> {
        None
    }

    fn default_value(&self, _path: &str) -> Option<String> {
        None
    }
}

/// The key store of the current host: HKEY_LOCAL_MACHINE on Windows, unavailable elsewhere.
pub fn system_key_store() -> Box<dyn KeyStore> {
    #[cfg(target_os = "windows")]
    {
        Box::new(crate::windows::WindowsRegistry::local_machine())
    }
    #[cfg(not(target_os = "windows"))]
    {
        Box::new(UnavailableKeyStore)
    }
}

/// In-memory store for tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct MemoryKeyStore {
    keys: std::collections::BTreeMap<String, Option<String>>,
}

#[cfg(test)]
impl MemoryKeyStore {
    pub(crate) fn with_key(mut self, path: &str, default_value: Option<&str>) -> Self {
        // Register every ancestor so subkey enumeration sees the chain.
        let mut prefix = String::new();
        for part in path.split('\\') {
            if !prefix.is_empty() {
                prefix.push('\\');
            }
            prefix.push_str(part);
            self.keys.entry(prefix.clone()).or_insert(None);
        }
        self.keys
            .insert(path.to_string(), default_value.map(String::from));
        self
    }
}

#[cfg(test)]
impl KeyStore for MemoryKeyStore {
    fn subkeys(&self, path: &str) -> Option<Vec<String>> {
        if !self.keys.contains_key(path) {
            return None;
        }
        let prefix = format!("{}\\", path);
        Some(
            self.keys
                .keys()
                .filter_map(|k| k.strip_prefix(&prefix))
                .filter(|rest| !rest.contains('\\'))
                .map(String::from)
                .collect(),
        )
    }

    fn default_value(&self, path: &str) -> Option<String> {
        self.keys.get(path).cloned().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_store_reports_nothing() {
        let store = UnavailableKeyStore;
        assert!(!store.is_available());
        assert!(store.subkeys(r"SOFTWARE\IronPython").is_none());
        assert!(store.default_value(r"SOFTWARE\IronPython").is_none());
    }

    #[test]
    fn test_memory_store_enumerates_immediate_children() {
        let store = MemoryKeyStore::default()
            .with_key(r"SOFTWARE\IronPython\2.7\InstallPath", Some(r"C:\IronPython 2.7\"))
            .with_key(r"SOFTWARE\IronPython\3.4\InstallPath", Some(r"C:\IronPython 3.4\"));
        assert_eq!(
            store.subkeys(r"SOFTWARE\IronPython").unwrap(),
            vec!["2.7".to_string(), "3.4".to_string()]
        );
        assert_eq!(
            store
                .default_value(r"SOFTWARE\IronPython\2.7\InstallPath")
                .as_deref(),
            Some(r"C:\IronPython 2.7\")
        );
        assert!(store.subkeys(r"SOFTWARE\Missing").is_none());
    }
}
