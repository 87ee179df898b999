//! Host interpreter lookup and host version resolution.
//!
//! The host version decides which IronPython install is selected. It comes
//! from an explicit value when given, otherwise from asking the host Python
//! interpreter, and finally falls back to [`DEFAULT_HOST_VERSION`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use ironpyc_core::{ProcessRunner, RunOptions, Version};

use crate::error::DetectError;
use crate::locator::{parse_probe_output, VERSION_PROBE_CODE};

/// Assumed when neither an explicit version nor a host interpreter is available.
pub const DEFAULT_HOST_VERSION: &str = "2.7.0";

/// IronPython 2.x 与 CPython 2 语法一致，优先找 python2
const HOST_PYTHON_CANDIDATES: &[&str] = &["python2", "python", "python3"];

/// Explicit interpreter if given, else the first candidate interpreter on PATH.
pub fn find_host_python(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        return Some(p.to_path_buf());
    }
    HOST_PYTHON_CANDIDATES
        .iter()
        .find_map(|name| which::which(name).ok())
}

/// Ask `python` for its `major.minor.patch`.
pub fn probe_host_version(
    python: &Path,
    runner: &dyn ProcessRunner,
    timeout: Option<Duration>,
) -> Option<Version> {
    let args = vec!["-c".to_string(), VERSION_PROBE_CODE.to_string()];
    match runner.run(python, &args, None, RunOptions::with_timeout(timeout)) {
        Ok(out) if out.success() => parse_probe_output(&out.output),
        Ok(out) => {
            tracing::debug!(python = %python.display(), exit_code = out.exit_code, "host version probe failed");
            None
        }
        Err(e) => {
            tracing::debug!(python = %python.display(), "host version probe failed: {}", e);
            None
        }
    }
}

/// Resolve the version runtimes are matched against.
///
/// An explicit value that does not parse is an error; a host interpreter that
/// cannot be asked only degrades to the default.
pub fn resolve_host_version(
    explicit: Option<&str>,
    host_python: Option<&Path>,
    runner: &dyn ProcessRunner,
    timeout: Option<Duration>,
) -> Result<Version, DetectError> {
    if let Some(raw) = explicit {
        return Ok(Version::parse(raw)?);
    }
    if let Some(python) = host_python {
        if let Some(version) = probe_host_version(python, runner, timeout) {
            tracing::debug!(python = %python.display(), %version, "host version from interpreter");
            return Ok(version);
        }
    }
    tracing::warn!(
        "host Python version unknown, assuming {}",
        DEFAULT_HOST_VERSION
    );
    Ok(Version::parse(DEFAULT_HOST_VERSION)?)
}
