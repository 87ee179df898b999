//! 按领域分组的配置结构体
//!
//! 从环境变量加载，统一 fallback 逻辑。CLI 参数在调用方覆盖这些值。

use super::env_keys::{build as build_keys, detect as detect_keys, observability as obv_keys};
use super::loader::{env_bool, env_list, env_optional, env_or, env_secs};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Registry roots probed for IronPython installs, in order.
pub const DEFAULT_REGISTRY_KEYS: &[&str] = &[
    r"SOFTWARE\IronPython",
    r"SOFTWARE\Wow6432Node\IronPython",
];

#[cfg(windows)]
pub const DEFAULT_EXECUTABLE: &str = "ipy.exe";
#[cfg(not(windows))]
pub const DEFAULT_EXECUTABLE: &str = "ipy";

/// 可观测性配置
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub quiet: bool,
    pub log_level: String,
    pub log_json: bool,
}

impl ObservabilityConfig {
    pub fn from_env() -> &'static Self {
        use std::sync::OnceLock;
        static CACHE: OnceLock<ObservabilityConfig> = OnceLock::new();
        CACHE.get_or_init(|| {
            super::loader::load_dotenv();
            Self {
                quiet: env_bool(obv_keys::IRONPYC_QUIET, &[], false),
                log_level: env_or(obv_keys::IRONPYC_LOG_LEVEL, &[], || {
                    "ironpyc=info".to_string()
                }),
                log_json: env_bool(obv_keys::IRONPYC_LOG_JSON, &[], false),
            }
        })
    }
}

/// Which discovery channel wins when both report the same version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiscoveryPrecedence {
    #[default]
    Registry,
    SearchPath,
}

impl FromStr for DiscoveryPrecedence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "registry" | "reg" => Ok(Self::Registry),
            "path" | "search-path" | "searchpath" => Ok(Self::SearchPath),
            other => Err(format!(
                "unknown discovery precedence '{}' (expected 'registry' or 'path')",
                other
            )),
        }
    }
}

/// 运行时探测配置
#[derive(Debug, Clone)]
pub struct DetectConfig {
    /// Registry roots, first existing one is used.
    pub registry_keys: Vec<String>,
    /// File name of the runtime executable.
    pub executable: String,
    /// Skip discovery and use this install directory.
    pub install_dir: Option<PathBuf>,
    /// Version the selected runtime should match.
    pub host_version: Option<String>,
    pub probe_timeout: Option<Duration>,
    pub precedence: DiscoveryPrecedence,
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            registry_keys: DEFAULT_REGISTRY_KEYS.iter().map(|s| s.to_string()).collect(),
            executable: DEFAULT_EXECUTABLE.to_string(),
            install_dir: None,
            host_version: None,
            probe_timeout: None,
            precedence: DiscoveryPrecedence::default(),
        }
    }
}

impl DetectConfig {
    /// 从环境变量加载，空值使用默认（会自动加载 .env）
    pub fn from_env() -> Self {
        super::loader::load_dotenv();
        let defaults = Self::default();
        let precedence = match env_optional(detect_keys::IRONPYC_DISCOVERY_PRECEDENCE, &[]) {
            Some(raw) => raw.parse().unwrap_or_else(|e: String| {
                tracing::warn!("{}, using registry precedence", e);
                DiscoveryPrecedence::Registry
            }),
            None => defaults.precedence,
        };
        Self {
            registry_keys: env_list(detect_keys::IRONPYC_REGISTRY_KEYS, &[])
                .filter(|keys| !keys.is_empty())
                .unwrap_or(defaults.registry_keys),
            executable: env_or(detect_keys::IRONPYC_EXECUTABLE, &[], || defaults.executable),
            install_dir: env_optional(detect_keys::IRONPYC_IPY_DIR, detect_keys::IPY_DIR_ALIASES)
                .map(PathBuf::from),
            host_version: env_optional(detect_keys::IRONPYC_HOST_VERSION, &[]),
            probe_timeout: env_secs(detect_keys::IRONPYC_PROBE_TIMEOUT_SECS, &[])
                .map(Duration::from_secs),
            precedence,
        }
    }
}

/// 编译配置
#[derive(Debug, Clone, Default)]
pub struct BuildConfig {
    /// Explicit host interpreter for module analysis; `None` tries `python3` then `python`.
    pub host_python: Option<PathBuf>,
    pub pyc_path: Option<PathBuf>,
    pub keep_response_file: bool,
    pub compile_timeout: Option<Duration>,
}

impl BuildConfig {
    pub fn from_env() -> Self {
        super::loader::load_dotenv();
        Self {
            host_python: env_optional(
                build_keys::IRONPYC_HOST_PYTHON,
                build_keys::HOST_PYTHON_ALIASES,
            )
            .map(PathBuf::from),
            pyc_path: env_optional(build_keys::IRONPYC_PYC_PATH, &[]).map(PathBuf::from),
            keep_response_file: env_bool(build_keys::IRONPYC_KEEP_RESPONSE_FILE, &[], false),
            compile_timeout: env_secs(build_keys::IRONPYC_COMPILE_TIMEOUT_SECS, &[])
                .map(Duration::from_secs),
        }
    }
}
