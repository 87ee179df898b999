use std::path::PathBuf;

use ironpyc_core::{Version, VersionParseError};
use thiserror::Error;

/// Errors returned by runtime discovery and version matching.
#[derive(Debug, Error)]
pub enum DetectError {
    /// A discovery channel (or all of them) found nothing usable.
    #[error("IronPython ({executable}) cannot be found via {channel}: {reason}")]
    Discovery {
        channel: &'static str,
        executable: String,
        reason: String,
    },

    /// The candidate exists but is not a working runtime.
    #[error("{} is not a valid IronPython executable: {reason}", .executable.display())]
    Validation { executable: PathBuf, reason: String },

    #[error("no IronPython runtime compatible with host version {host} (found: {found})")]
    NoCompatibleRuntime { host: Version, found: String },

    #[error("invalid host version: {0}")]
    HostVersion(#[from] VersionParseError),
}
