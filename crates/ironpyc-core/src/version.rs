//! Three-part version numbers reported by Python runtimes.
//!
//! Accepts `major.minor[.patch][prerelease]`, e.g. `2.7`, `2.7.12`, `2.7.0b1`,
//! `3.4.0-rc2`. A missing patch component is `0`. The prerelease tag is kept
//! verbatim so that formatting reproduces it.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid version number '{0}' (expected major.minor.patch[prerelease])")]
pub struct VersionParseError(pub String);

#[derive(Debug, Clone)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    prerelease: Option<String>,
}

fn version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d+)\.(\d+)(?:\.(\d+))?([A-Za-z\-][0-9A-Za-z.\-]*)?$")
            .expect("static version regex")
    })
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: None,
        }
    }

    pub fn with_prerelease(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        self.prerelease = if tag.is_empty() { None } else { Some(tag) };
        self
    }

    pub fn parse(s: &str) -> Result<Self, VersionParseError> {
        let trimmed = s.trim();
        let caps = version_regex()
            .captures(trimmed)
            .ok_or_else(|| VersionParseError(s.to_string()))?;
        let num = |i: usize| -> Result<u64, VersionParseError> {
            match caps.get(i) {
                Some(m) => m
                    .as_str()
                    .parse::<u64>()
                    .map_err(|_| VersionParseError(s.to_string())),
                None => Ok(0),
            }
        };
        Ok(Self {
            major: num(1)?,
            minor: num(2)?,
            patch: num(3)?,
            prerelease: caps.get(4).map(|m| m.as_str().to_string()),
        })
    }

    pub fn prerelease(&self) -> Option<&str> {
        self.prerelease.as_deref()
    }

    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }

    /// Reduced `major.minor` key, for callers that do not need patch precision.
    pub fn major_minor(&self) -> String {
        format!("{}.{}", self.major, self.minor)
    }

    pub fn same_minor(&self, other: &Version) -> bool {
        self.major == other.major && self.minor == other.minor
    }

    pub fn same_major(&self, other: &Version) -> bool {
        self.major == other.major
    }

    fn triple(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.patch)
    }
}

/// `b10` sorts after `b2`: compare the alphabetic head, then the numeric tail.
fn prerelease_cmp(a: &str, b: &str) -> Ordering {
    fn split(tag: &str) -> (&str, Option<u64>, &str) {
        let head_end = tag
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(tag.len());
        let (head, rest) = tag.split_at(head_end);
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let (digits, tail) = rest.split_at(digits_end);
        (head, digits.parse().ok(), tail)
    }
    let (ha, na, ta) = split(a);
    let (hb, nb, tb) = split(b);
    ha.cmp(hb).then(na.cmp(&nb)).then(ta.cmp(tb))
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.triple().cmp(&other.triple()).then_with(|| {
            match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                // A final release ranks above any prerelease of the same triple.
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => prerelease_cmp(a, b),
            }
        })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.triple() == other.triple() && self.prerelease == other.prerelease
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.triple().hash(state);
        self.prerelease.hash(state);
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(ref tag) = self.prerelease {
            f.write_str(tag)?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
