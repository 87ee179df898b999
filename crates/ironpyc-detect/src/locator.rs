//! Runtime discovery: registry probe, search-path probe, validation probe.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use ironpyc_core::config::{DetectConfig, DiscoveryPrecedence};
use ironpyc_core::{ProcessRunner, RunOptions, SystemProcessRunner, Version};
use regex::Regex;
use serde::Serialize;

use crate::error::DetectError;
use crate::info_log;
use crate::key_store::{system_key_store, KeyStore};
use crate::matcher::{reconcile_host_version, select_optimum};

/// Expression the validation probe asks the candidate to evaluate.
pub const VERSION_PROBE_CODE: &str = "import sys; print('%d.%d.%d' % sys.version_info[:3])";

const REGISTRY_CHANNEL: &str = "the registry";
const SEARCH_PATH_CHANNEL: &str = "PATH";
const ALL_CHANNELS: &str = "the registry or PATH";

fn probe_output_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([0-9]+\.[0-9]+(?:\.[0-9]+)?)\s*(?:$|\n)").expect("static probe regex")
    })
}

/// Version printed by [`VERSION_PROBE_CODE`], if the output starts with one.
pub(crate) fn parse_probe_output(output: &str) -> Option<Version> {
    let caps = probe_output_regex().captures(output.trim_start())?;
    Version::parse(&caps[1]).ok()
}

/// Installed runtimes keyed by version. Each version maps to exactly one
/// install directory; the first entry recorded for a version is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RuntimeMap(BTreeMap<Version, PathBuf>);

impl RuntimeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `dir` for `version` unless the version is already present.
    /// Returns `true` when the entry was added.
    pub fn insert_if_absent(&mut self, version: Version, dir: PathBuf) -> bool {
        match self.0.entry(version) {
            std::collections::btree_map::Entry::Occupied(_) => false,
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(dir);
                true
            }
        }
    }

    /// Union of two maps; entries of `self` win on key collision.
    pub fn merged_with(mut self, other: RuntimeMap) -> RuntimeMap {
        for (version, dir) in other.0 {
            self.insert_if_absent(version, dir);
        }
        self
    }

    pub fn get(&self, version: &Version) -> Option<&Path> {
        self.0.get(version).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Ascending by version.
    pub fn iter(&self) -> impl Iterator<Item = (&Version, &Path)> {
        self.0.iter().map(|(v, p)| (v, p.as_path()))
    }

    pub fn versions(&self) -> impl Iterator<Item = &Version> {
        self.0.keys()
    }

    /// Reduced view keyed by `major.minor`; the newest install of each pair wins.
    pub fn by_major_minor(&self) -> BTreeMap<String, PathBuf> {
        let mut reduced = BTreeMap::new();
        // Ascending iteration, so later (newer) versions overwrite older ones.
        for (version, dir) in &self.0 {
            reduced.insert(version.major_minor(), dir.clone());
        }
        reduced
    }

    pub fn describe(&self) -> String {
        if self.0.is_empty() {
            return "none".to_string();
        }
        self.0
            .keys()
            .map(Version::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl FromIterator<(Version, PathBuf)> for RuntimeMap {
    fn from_iter<I: IntoIterator<Item = (Version, PathBuf)>>(iter: I) -> Self {
        let mut map = RuntimeMap::new();
        for (version, dir) in iter {
            map.insert_if_absent(version, dir);
        }
        map
    }
}

/// Directory part of a registry `InstallPath` value, with the same semantics
/// as a path `dirname`: `C:\IronPython 2.7\` and `C:\IronPython 2.7\ipy.exe`
/// both give `C:\IronPython 2.7`.
pub fn install_dir_from_value(value: &str) -> Option<PathBuf> {
    let is_sep = |c: char| c == '\\' || c == '/';
    let idx = value.rfind(is_sep)?;
    let head = value[..idx].trim_end_matches(is_sep);
    if head.is_empty() || head.ends_with(':') {
        // Root of a drive or filesystem: keep the separator.
        return Some(PathBuf::from(&value[..=idx]));
    }
    Some(PathBuf::from(head))
}

/// Directories listed in the `PATH` environment variable, in order.
pub fn search_dirs_from_env() -> Vec<PathBuf> {
    std::env::var_os("PATH")
        .map(|p| std::env::split_paths(&p).collect())
        .unwrap_or_default()
}

/// Discovers and validates IronPython installs.
pub struct RuntimeLocator {
    config: DetectConfig,
    runner: Arc<dyn ProcessRunner>,
    key_store: Box<dyn KeyStore>,
}

impl RuntimeLocator {
    /// Locator backed by real processes and the host's registry.
    pub fn new(config: DetectConfig) -> Self {
        Self::with_parts(config, Arc::new(SystemProcessRunner), system_key_store())
    }

    pub fn with_parts(
        config: DetectConfig,
        runner: Arc<dyn ProcessRunner>,
        key_store: Box<dyn KeyStore>,
    ) -> Self {
        Self {
            config,
            runner,
            key_store,
        }
    }

    pub fn config(&self) -> &DetectConfig {
        &self.config
    }

    fn run_options(&self) -> RunOptions {
        RunOptions::with_timeout(self.config.probe_timeout)
    }

    fn discovery_error(&self, channel: &'static str, reason: impl Into<String>) -> DetectError {
        DetectError::Discovery {
            channel,
            executable: self.config.executable.clone(),
            reason: reason.into(),
        }
    }

    /// Run `executable -c <version expression>` and parse the version it prints.
    pub fn validate(&self, executable: &Path) -> Result<Version, DetectError> {
        let invalid = |reason: String| DetectError::Validation {
            executable: executable.to_path_buf(),
            reason,
        };
        let args = vec!["-c".to_string(), VERSION_PROBE_CODE.to_string()];
        let out = self
            .runner
            .run(executable, &args, None, self.run_options())
            .map_err(|e| invalid(e.to_string()))?;
        if !out.success() {
            return Err(invalid(format!(
                "version probe exited with status {}",
                out.exit_code
            )));
        }
        parse_probe_output(&out.output)
            .ok_or_else(|| invalid(format!("unexpected version output {:?}", out.output.trim())))
    }

    /// Validate the executable inside `dir`.
    pub fn validate_dir(&self, dir: &Path) -> Result<Version, DetectError> {
        self.validate(&dir.join(&self.config.executable))
    }

    /// Enumerate installs registered under the first existing registry root.
    pub fn probe_registry(&self) -> Result<RuntimeMap, DetectError> {
        if !self.key_store.is_available() {
            return Err(self.discovery_error(
                REGISTRY_CHANNEL,
                "no registry on this host",
            ));
        }
        let (root, children) = self
            .config
            .registry_keys
            .iter()
            .find_map(|root| self.key_store.subkeys(root).map(|c| (root, c)))
            .ok_or_else(|| {
                self.discovery_error(
                    REGISTRY_CHANNEL,
                    format!("none of the keys exist: {}", self.config.registry_keys.join(", ")),
                )
            })?;
        tracing::debug!(root = %root, versions = ?children, "registry root opened");

        let mut found = RuntimeMap::new();
        for child in &children {
            let value_path = format!("{}\\{}\\InstallPath", root, child);
            let Some(value) = self.key_store.default_value(&value_path) else {
                tracing::debug!(key = %value_path, "no InstallPath value, skipping");
                continue;
            };
            let Some(dir) = install_dir_from_value(&value) else {
                tracing::debug!(key = %value_path, value = %value, "InstallPath is not a path, skipping");
                continue;
            };
            match self.validate_dir(&dir) {
                Ok(version) => {
                    info_log!("registry: IronPython {} at {}", version, dir.display());
                    found.insert_if_absent(version, dir);
                }
                Err(e) => tracing::debug!(registered = %child, "skipping registry entry: {}", e),
            }
        }

        if found.is_empty() {
            return Err(self.discovery_error(
                REGISTRY_CHANNEL,
                format!("no registered install under {} validated", root),
            ));
        }
        Ok(found)
    }

    /// Look for the executable in each of `dirs`, in order.
    pub fn probe_search_path(&self, dirs: &[PathBuf]) -> Result<RuntimeMap, DetectError> {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let mut seen_dirs = HashSet::new();
        let mut found = RuntimeMap::new();

        for dir in dirs {
            if dir.as_os_str().is_empty() {
                continue;
            }
            let Ok(exe) = which::which_in(&self.config.executable, Some(dir), &cwd) else {
                continue;
            };
            let install_dir = exe.parent().map(Path::to_path_buf).unwrap_or_else(|| dir.clone());
            let key = install_dir
                .canonicalize()
                .unwrap_or_else(|_| install_dir.clone());
            if !seen_dirs.insert(key) {
                continue;
            }
            match self.validate(&exe) {
                Ok(version) => {
                    info_log!("PATH: IronPython {} at {}", version, install_dir.display());
                    found.insert_if_absent(version, install_dir);
                }
                Err(e) => tracing::debug!("skipping PATH candidate: {}", e),
            }
        }

        if found.is_empty() {
            return Err(self.discovery_error(
                SEARCH_PATH_CHANNEL,
                format!("searched {} directories", dirs.len()),
            ));
        }
        Ok(found)
    }

    /// Run both probes and merge their results. A failing probe counts as
    /// "found nothing"; only an empty union is an error.
    pub fn discover(&self) -> Result<RuntimeMap, DetectError> {
        self.discover_in(&search_dirs_from_env())
    }

    pub fn discover_in(&self, search_dirs: &[PathBuf]) -> Result<RuntimeMap, DetectError> {
        let registry = self.probe_registry().unwrap_or_else(|e| {
            tracing::debug!("{}", e);
            RuntimeMap::new()
        });
        let search_path = self.probe_search_path(search_dirs).unwrap_or_else(|e| {
            tracing::debug!("{}", e);
            RuntimeMap::new()
        });

        let merged = match self.config.precedence {
            DiscoveryPrecedence::Registry => registry.merged_with(search_path),
            DiscoveryPrecedence::SearchPath => search_path.merged_with(registry),
        };
        if merged.is_empty() {
            return Err(self.discovery_error(ALL_CHANNELS, "no validated install"));
        }
        Ok(merged)
    }

    /// Resolve the install to use for `host`: the configured directory when one
    /// is set (still validated), otherwise discovery plus version matching.
    pub fn auto_detect(&self, host: &Version) -> Result<(Version, PathBuf), DetectError> {
        if let Some(ref dir) = self.config.install_dir {
            let version = self.validate_dir(dir)?;
            tracing::info!("using configured IronPython {} at {}", version, dir.display());
            return Ok((version, dir.clone()));
        }
        let runtimes = self.discover()?;
        let (version, dir) = self.select_for_host(host, &runtimes)?;
        tracing::info!("selected IronPython {} at {}", version, dir.display());
        Ok((version, dir))
    }

    /// Match `runtimes` against `host`. A host version read from an interpreter
    /// (none configured) whose major no runtime shares is treated as unknown.
    pub fn select_for_host(
        &self,
        host: &Version,
        runtimes: &RuntimeMap,
    ) -> Result<(Version, PathBuf), DetectError> {
        if self.config.host_version.is_some() {
            return select_optimum(host, runtimes);
        }
        select_optimum(&reconcile_host_version(host, runtimes), runtimes)
    }
}
