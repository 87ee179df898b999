//! Pick the installed runtime that best matches the host version.
//!
//! Priority: exact version, then the newest install sharing major and minor,
//! then the newest install sharing only the major version.

use std::fmt;
use std::path::PathBuf;

use ironpyc_core::Version;
use serde::Serialize;

use crate::error::DetectError;
use crate::host::DEFAULT_HOST_VERSION;
use crate::locator::RuntimeMap;

/// How closely a runtime matches the host version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Incompatible,
    Major,
    Minor,
    Exact,
}

impl fmt::Display for MatchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Exact => "exact",
            Self::Minor => "minor",
            Self::Major => "major",
            Self::Incompatible => "incompatible",
        })
    }
}

pub fn match_tier(host: &Version, candidate: &Version) -> MatchTier {
    if candidate == host {
        MatchTier::Exact
    } else if candidate.same_minor(host) {
        MatchTier::Minor
    } else if candidate.same_major(host) {
        MatchTier::Major
    } else {
        MatchTier::Incompatible
    }
}

/// Host version to match with when no runtime shares the host's major version.
///
/// 探测到的宿主（如 python3）与所有已安装运行时主版本都不同时，视为未知并退回默认版本。
pub fn reconcile_host_version(host: &Version, runtimes: &RuntimeMap) -> Version {
    if runtimes.is_empty() || runtimes.versions().any(|v| v.same_major(host)) {
        return host.clone();
    }
    let fallback = Version::parse(DEFAULT_HOST_VERSION).unwrap_or_else(|_| host.clone());
    tracing::warn!(
        %host,
        found = %runtimes.describe(),
        "no runtime shares the host major version, assuming {}",
        fallback
    );
    fallback
}

pub fn select_optimum(
    host: &Version,
    runtimes: &RuntimeMap,
) -> Result<(Version, PathBuf), DetectError> {
    if let Some(dir) = runtimes.get(host) {
        tracing::debug!(%host, "exact runtime match");
        return Ok((host.clone(), dir.to_path_buf()));
    }

    let newest = |tier: MatchTier| {
        runtimes
            .iter()
            .filter(|(v, _)| match_tier(host, v) == tier)
            .max_by(|(a, _), (b, _)| a.cmp(b))
    };
    for tier in [MatchTier::Minor, MatchTier::Major] {
        if let Some((version, dir)) = newest(tier) {
            tracing::debug!(%host, %version, %tier, "runtime matched");
            return Ok((version.clone(), dir.to_path_buf()));
        }
    }

    Err(DetectError::NoCompatibleRuntime {
        host: host.clone(),
        found: runtimes.describe(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn map(versions: &[&str]) -> RuntimeMap {
        versions
            .iter()
            .map(|s| (v(s), PathBuf::from(format!("/ipy/{}", s))))
            .collect()
    }

    #[test]
    fn test_exact_match_wins() {
        let runtimes = map(&["2.7.0", "2.7.3", "2.6.9"]);
        let (version, dir) = select_optimum(&v("2.7.0"), &runtimes).unwrap();
        assert_eq!(version, v("2.7.0"));
        assert_eq!(dir, PathBuf::from("/ipy/2.7.0"));
    }

    #[test]
    fn test_minor_tier_picks_newest_patch() {
        let runtimes = map(&["2.7.3", "2.6.9", "3.1.0"]);
        let (version, _) = select_optimum(&v("2.7.0"), &runtimes).unwrap();
        assert_eq!(version, v("2.7.3"));

        let runtimes = map(&["2.7.1", "2.7.5b1", "2.7.5", "2.7.4"]);
        let (version, _) = select_optimum(&v("2.7.0"), &runtimes).unwrap();
        assert_eq!(version, v("2.7.5"));
    }

    #[test]
    fn test_major_tier_when_no_minor_match() {
        let runtimes = map(&["2.6.9", "3.1.0"]);
        let (version, dir) = select_optimum(&v("2.7.0"), &runtimes).unwrap();
        assert_eq!(version, v("2.6.9"));
        assert_eq!(dir, PathBuf::from("/ipy/2.6.9"));

        let runtimes = map(&["2.5.2", "2.6.1", "3.4.0"]);
        let (version, _) = select_optimum(&v("2.7.0"), &runtimes).unwrap();
        assert_eq!(version, v("2.6.1"));
    }

    #[test]
    fn test_no_compatible_runtime() {
        let err = select_optimum(&v("2.7.0"), &map(&["3.1.0"])).unwrap_err();
        assert!(matches!(err, DetectError::NoCompatibleRuntime { .. }));
        assert!(err.to_string().contains("3.1.0"));

        assert!(select_optimum(&v("2.7.0"), &RuntimeMap::new()).is_err());
    }

    #[test]
    fn test_match_tier() {
        assert_eq!(match_tier(&v("2.7.0"), &v("2.7.0")), MatchTier::Exact);
        assert_eq!(match_tier(&v("2.7.0"), &v("2.7.3")), MatchTier::Minor);
        assert_eq!(match_tier(&v("2.7.0"), &v("2.6.9")), MatchTier::Major);
        assert_eq!(match_tier(&v("2.7.0"), &v("3.1.0")), MatchTier::Incompatible);
        assert!(MatchTier::Exact > MatchTier::Minor);
    }

    #[test]
    fn test_reconcile_keeps_host_sharing_a_major() {
        let runtimes = map(&["2.7.12", "3.4.0"]);
        assert_eq!(reconcile_host_version(&v("3.11.7"), &runtimes), v("3.11.7"));
        assert_eq!(
            reconcile_host_version(&v("3.11.7"), &RuntimeMap::new()),
            v("3.11.7")
        );
    }

    #[test]
    fn test_reconcile_foreign_major_uses_default_host() {
        let runtimes = map(&["2.7.12"]);
        let host = reconcile_host_version(&v("3.11.7"), &runtimes);
        assert_eq!(host.to_string(), DEFAULT_HOST_VERSION);
        let (version, _) = select_optimum(&host, &runtimes).unwrap();
        assert_eq!(version, v("2.7.12"));
    }
}
