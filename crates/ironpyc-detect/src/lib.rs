//! IronPython runtime discovery.
//!
//! Two independent channels feed one version-keyed [`RuntimeMap`]: the
//! registry (Windows only, through the [`KeyStore`] capability) and a search
//! over PATH-like directory lists. Every candidate is validated by running it.
//! [`select_optimum`] then picks the install that best matches a host version.

pub mod error;
pub mod host;
pub mod key_store;
pub mod locator;
pub mod log;
pub mod matcher;

#[cfg(target_os = "windows")]
pub mod windows;

pub use error::DetectError;
pub use host::{find_host_python, resolve_host_version, DEFAULT_HOST_VERSION};
pub use key_store::{system_key_store, KeyStore, UnavailableKeyStore};
pub use locator::{RuntimeLocator, RuntimeMap};
pub use matcher::{match_tier, reconcile_host_version, select_optimum, MatchTier};
