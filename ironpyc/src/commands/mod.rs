//! Command implementations shared by the dispatch layer.

pub mod analyze;
pub mod compile;
pub mod detect;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ironpyc_build::{default_search_dirs, DependencyAnalyzer, InterpreterModuleFinder};
use ironpyc_core::config::{BuildConfig, DetectConfig};
use ironpyc_core::{SystemProcessRunner, Version};
use ironpyc_detect::{find_host_python, resolve_host_version, RuntimeLocator};

/// Env config with CLI overrides applied.
pub(crate) fn detect_config(ipy_dir: Option<&Path>, host_version: Option<&str>) -> DetectConfig {
    let mut config = DetectConfig::from_env();
    if let Some(dir) = ipy_dir {
        config.install_dir = Some(dir.to_path_buf());
    }
    if let Some(v) = host_version {
        config.host_version = Some(v.to_string());
    }
    config
}

pub(crate) fn host_version(detect: &DetectConfig, build: &BuildConfig) -> Result<Version> {
    let python = find_host_python(build.host_python.as_deref());
    let version = resolve_host_version(
        detect.host_version.as_deref(),
        python.as_deref(),
        &SystemProcessRunner,
        detect.probe_timeout,
    )?;
    Ok(version)
}

/// Pick the IronPython install for this run.
pub(crate) fn select_runtime(detect: DetectConfig, build: &BuildConfig) -> Result<(Version, PathBuf)> {
    let host = host_version(&detect, build)?;
    let locator = RuntimeLocator::new(detect);
    let selected = locator
        .auto_detect(&host)
        .with_context(|| format!("No usable IronPython runtime for host Python {}", host))?;
    Ok(selected)
}

/// Analyzer backed by the host interpreter, plus the directories it should search.
pub(crate) fn analyzer_for(
    build: &BuildConfig,
    install_dir: &Path,
    module_dirs: &[PathBuf],
) -> Result<(DependencyAnalyzer, Vec<PathBuf>)> {
    let python = find_host_python(build.host_python.as_deref()).context(
        "No host Python interpreter found for module analysis (set IRONPYC_HOST_PYTHON)",
    )?;
    let finder = InterpreterModuleFinder::new(python);

    let search_dirs = if module_dirs.is_empty() {
        let host_path = finder.host_module_path().unwrap_or_else(|e| {
            tracing::warn!("cannot read host module path, searching IronPython Lib only: {}", e);
            Vec::new()
        });
        default_search_dirs(install_dir, &host_path)
    } else {
        module_dirs.to_vec()
    };
    tracing::debug!(?search_dirs, "module search directories");
    Ok((DependencyAnalyzer::new(Box::new(finder)), search_dirs))
}
