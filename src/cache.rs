//! Version cache (C7).
//!
//! Persists `<cachedir>/cache.json`: a flat map *distribution → available
//! versions, most-recent first*. Loads best-effort (missing or corrupt
//! file means empty cache); a refresh only replaces an entry when the new
//! result is non-empty, protecting against transient zero-result API
//! responses (spec.md §4.7).

use std::collections::HashMap;

use anyhow::{Context as _, Result};
use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::version::{sort_descending_dropping_invalid, Version};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cache {
    versions: HashMap<String, Vec<Version>>,
}

impl Cache {
    /// Best-effort load: a missing file is an empty cache; a corrupt file
    /// is an empty cache with a warning, never a hard error.
    pub fn load(path: &Utf8Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                tracing::warn!("unable to read cache {path}, starting empty: {e}");
                return Self::default();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(cache) => cache,
            Err(e) => {
                tracing::warn!("cache {path} is corrupt, starting empty: {e}");
                Self::default()
            }
        }
    }

    /// Write the cache, truncating, with permission `0640` on unix.
    pub fn save(&self, path: &Utf8Path) -> Result<()> {
        let body = serde_json::to_string_pretty(self).context("unable to serialize cache")?;
        std::fs::write(path, body).with_context(|| format!("unable to write cache {path}"))?;
        set_cache_permissions(path)?;
        Ok(())
    }

    pub fn get(&self, distribution: &str) -> &[Version] {
        self.versions
            .get(distribution)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Replace `distribution`'s entry with `raw`, sorted descending and
    /// with unparseable tokens dropped, UNLESS the result would be empty
    /// and an existing non-empty entry is already present.
    pub fn refresh(&mut self, distribution: &str, raw: Vec<String>) {
        let sorted = sort_descending_dropping_invalid(raw);
        if sorted.is_empty() && self.versions.contains_key(distribution) {
            tracing::warn!("refresh for '{distribution}' returned no versions, keeping previous list");
            return;
        }
        self.versions.insert(distribution.to_string(), sorted);
    }

    pub fn distributions(&self) -> impl Iterator<Item = &str> {
        self.versions.keys().map(String::as_str)
    }
}

#[cfg(unix)]
fn set_cache_permissions(path: &Utf8Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt as _;
    let perm = std::fs::Permissions::from_mode(0o640);
    std::fs::set_permissions(path, perm)
        .with_context(|| format!("unable to set permissions on {path}"))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_cache_permissions(_path: &Utf8Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn load_missing_file_yields_empty_cache() {
        let dir = tempdir().unwrap();
        let path = Utf8Path::from_path(dir.path()).unwrap().join("cache.json");
        let cache = Cache::load(&path);
        assert!(cache.get("kubectl").is_empty());
    }

    #[test]
    fn load_corrupt_file_yields_empty_cache() {
        let dir = tempdir().unwrap();
        let path = Utf8Path::from_path(dir.path()).unwrap().join("cache.json");
        std::fs::write(&path, "not json").unwrap();
        let cache = Cache::load(&path);
        assert!(cache.get("kubectl").is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let path = Utf8Path::from_path(dir.path()).unwrap().join("cache.json");
        let mut cache = Cache::default();
        cache.refresh("kubectl", vec!["1.28.3".to_string(), "1.27.10".to_string()]);
        cache.save(&path).unwrap();

        let reloaded = Cache::load(&path);
        assert_eq!(reloaded.get("kubectl"), &[v("1.28.3"), v("1.27.10")]);
    }

    #[test]
    fn refresh_preserves_previous_nonempty_list_on_empty_result() {
        let mut cache = Cache::default();
        cache.refresh("kubectl", vec!["1.28.3".to_string()]);
        cache.refresh("kubectl", vec![]);
        assert_eq!(cache.get("kubectl"), &[v("1.28.3")]);
    }

    #[test]
    fn refresh_accepts_empty_result_when_nothing_cached_yet() {
        let mut cache = Cache::default();
        cache.refresh("kubectl", vec![]);
        assert!(cache.get("kubectl").is_empty());
    }
}
