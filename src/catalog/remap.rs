//! Platform remapper (C2).
//!
//! A per-distribution table from canonical tokens (`amd64`, `arm64`,
//! `linux`, `darwin`, …) to whatever a vendor names the same thing
//! (`x86_64`, `Linux`, …). Absent a table, the identity mapping applies.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemapTable {
    #[serde(default)]
    map: HashMap<String, String>,
}

impl RemapTable {
    pub fn interpolate(&self, canonical: &str) -> String {
        self.map
            .get(canonical)
            .cloned()
            .unwrap_or_else(|| canonical.to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Canonical OS token for the running host, matching Go's `runtime.GOOS`
/// vocabulary (`linux`, `darwin`, `windows`, …).
pub fn canonical_os() -> String {
    match std::env::consts::OS {
        "macos" => "darwin".to_string(),
        other => other.to_string(),
    }
}

/// Canonical architecture token for the running host, matching Go's
/// `runtime.GOARCH` vocabulary (`amd64`, `arm64`, …).
pub fn canonical_arch() -> String {
    match std::env::consts::ARCH {
        "x86_64" => "amd64".to_string(),
        "x86" => "386".to_string(),
        "aarch64" => "arm64".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmapped_token_passes_through_unchanged() {
        let table = RemapTable::default();
        assert_eq!(table.interpolate("amd64"), "amd64");
    }

    #[test]
    fn mapped_token_is_substituted() {
        let mut map = HashMap::new();
        map.insert("amd64".to_string(), "x86_64".to_string());
        let table = RemapTable { map };
        assert_eq!(table.interpolate("amd64"), "x86_64");
        assert_eq!(table.interpolate("arm64"), "arm64");
    }
}
