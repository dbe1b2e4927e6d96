//! Canonical version handling shared by the lister, cache, lock-file
//! solver and resolver.
//!
//! A `Version` is a parsed `MAJOR.MINOR.PATCH[-PRE][+BUILD]` token; a
//! leading `v` is stripped before parsing, matching the original's
//! `gov.Must(gov.NewVersion(v))` normalization in `tpl.go`.

use std::fmt;
use std::str::FromStr;

use semver::Version as SemverVersion;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version(SemverVersion);

impl Version {
    /// Strip a leading `v`/`V` and parse as semver. Idempotent: parsing the
    /// canonical string form of an already-parsed version returns the same
    /// value.
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let trimmed = raw.trim().trim_start_matches(['v', 'V']);
        let parsed = SemverVersion::parse(trimmed)
            .map_err(|e| anyhow::anyhow!("invalid version '{raw}': {e}"))?;
        Ok(Self(parsed))
    }

    pub fn canonical(&self) -> String {
        self.0.to_string()
    }

    pub fn is_prerelease(&self) -> bool {
        !self.0.pre.is_empty()
    }

    pub fn major(&self) -> u64 {
        self.0.major
    }

    pub fn minor(&self) -> u64 {
        self.0.minor
    }

    pub fn patch(&self) -> u64 {
        self.0.patch
    }

    pub fn inner(&self) -> &SemverVersion {
        &self.0
    }
}

impl FromStr for Version {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl TryFrom<String> for Version {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Version::parse(&value)
    }
}

impl From<Version> for String {
    fn from(value: Version) -> Self {
        value.canonical()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sort a list of raw version strings by canonical semver, descending,
/// dropping anything that doesn't parse (spec.md §3: "Invalid tokens are
/// dropped with a warning, never fatal").
pub fn sort_descending_dropping_invalid(raw: impl IntoIterator<Item = String>) -> Vec<Version> {
    let mut versions: Vec<Version> = raw
        .into_iter()
        .filter_map(|s| match Version::parse(&s) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("dropping unparseable version '{s}': {e}");
                None
            }
        })
        .collect();
    versions.sort_by(|a, b| b.cmp(a));
    versions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_leading_v() {
        let v = Version::parse("v1.2.3").unwrap();
        assert_eq!(v.canonical(), "1.2.3");
    }

    #[test]
    fn canonicalization_is_idempotent() {
        let v1 = Version::parse("v1.2.3-rc.1").unwrap();
        let v2 = Version::parse(&v1.canonical()).unwrap();
        assert_eq!(v1, v2);
        assert_eq!(v1.canonical(), v2.canonical());
    }

    #[test]
    fn equality_is_by_canonical_form() {
        assert_eq!(Version::parse("v1.2.3").unwrap(), Version::parse("1.2.3").unwrap());
    }

    #[test]
    fn prerelease_detected() {
        assert!(Version::parse("1.28.0-rc.1").unwrap().is_prerelease());
        assert!(!Version::parse("1.28.0").unwrap().is_prerelease());
    }

    #[test]
    fn sort_drops_invalid_and_orders_descending() {
        let input = vec![
            "1.28.3".to_string(),
            "not-a-version".to_string(),
            "1.27.10".to_string(),
            "1.28.0-rc.1".to_string(),
        ];
        let sorted = sort_descending_dropping_invalid(input);
        let strs: Vec<_> = sorted.iter().map(Version::canonical).collect();
        assert_eq!(strs, vec!["1.28.3", "1.28.0-rc.1", "1.27.10"]);
    }
}
