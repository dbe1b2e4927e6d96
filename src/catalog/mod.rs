//! Catalog (C6).
//!
//! Reads `<configdir>/distributions.yaml`, a mapping distribution → strategy
//! descriptors, and instantiates one lister/fetcher/installer (and
//! optionally a remapper) per distribution. Unknown strategy types are
//! logged and skipped; the catalog still serves every distribution whose
//! strategies all resolved.

pub mod fetch;
pub mod install;
pub mod list;
pub mod remap;
pub mod template;

use std::collections::HashMap;

use anyhow::{Context as _, Result};
use camino::Utf8Path;
use reqwest::Client;
use serde::Deserialize;

use fetch::FetchStrategy;
use install::InstallStrategy;
use list::ListStrategy;
use remap::RemapTable;

const DEFAULT_CATALOG_URL: &str =
    "https://raw.githubusercontent.com/devops-works/binenv/master/definitions/definitions.yaml";

/// Digest algorithm for the optional post-fetch/pre-install checksum hook
/// (SPEC_FULL.md §4.13 — resolves spec.md §9's open question).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    Sha256,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChecksumSpec {
    pub algorithm: ChecksumAlgorithm,
    pub url_template: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub description: Option<String>,
    pub url: Option<String>,
    pub remap: RemapTable,
    pub list: ListStrategy,
    pub fetch: FetchStrategy,
    pub install: InstallStrategy,
    pub message: Option<String>,
    /// `(os, arch)` pairs the distribution is known to support; `None`
    /// means unrestricted.
    pub platforms: Option<Vec<(String, String)>>,
    pub checksum: Option<ChecksumSpec>,
}

impl CatalogEntry {
    pub fn supports(&self, os: &str, arch: &str) -> bool {
        match &self.platforms {
            None => true,
            Some(pairs) => pairs.iter().any(|(o, a)| o == os && a == arch),
        }
    }
}

#[derive(Debug, Default)]
pub struct Catalog {
    entries: HashMap<String, CatalogEntry>,
    /// Distributions whose descriptor named an unrecognized strategy type,
    /// with the reason; collected rather than aborting the whole load.
    pub skipped: Vec<(String, String)>,
}

impl Catalog {
    /// Build a catalog directly from already-resolved entries, bypassing
    /// YAML parsing; used by callers (and tests) that construct entries
    /// programmatically.
    pub fn from_entries(entries: HashMap<String, CatalogEntry>) -> Self {
        Self {
            entries,
            skipped: Vec::new(),
        }
    }

    pub fn get(&self, distribution: &str) -> Option<&CatalogEntry> {
        self.entries.get(distribution)
    }

    pub fn distributions(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn distributions_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> {
        self.distributions().filter(move |d| d.starts_with(prefix))
    }

    pub fn parse(yaml: &str) -> Result<Self> {
        let raw: HashMap<String, RawEntry> =
            serde_yaml::from_str(yaml).context("catalog is not valid YAML")?;

        let mut entries = HashMap::new();
        let mut skipped = Vec::new();

        for (name, raw_entry) in raw {
            match raw_entry.into_entry() {
                Ok(entry) => {
                    entries.insert(name, entry);
                }
                Err(reason) => {
                    tracing::warn!("skipping distribution '{name}': {reason}");
                    skipped.push((name, reason));
                }
            }
        }

        Ok(Self { entries, skipped })
    }

    /// Load the catalog from `path`, fetching it from `source_url` first if
    /// the file doesn't exist yet (spec.md §4.6).
    pub async fn load_or_fetch(path: &Utf8Path, client: &Client, source_url: Option<&str>) -> Result<Self> {
        if !path.exists() {
            let url = source_url.unwrap_or(DEFAULT_CATALOG_URL);
            tracing::info!("catalog missing at {path}, fetching from {url}");
            let body = client
                .get(url)
                .send()
                .await
                .context("unable to fetch catalog")?
                .error_for_status()
                .context("catalog fetch returned an error status")?
                .text()
                .await
                .context("unable to read catalog response body")?;

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("unable to create catalog directory {parent}"))?;
            }
            std::fs::write(path, &body).with_context(|| format!("unable to write catalog to {path}"))?;
            return Self::parse(&body);
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("unable to read catalog {path}"))?;
        Self::parse(&contents)
    }
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    description: Option<String>,
    url: Option<String>,
    #[serde(default)]
    remap: RemapTable,
    list: RawList,
    fetch: RawFetch,
    install: RawInstall,
    message: Option<String>,
    platforms: Option<Vec<RawPlatform>>,
    checksum: Option<ChecksumSpec>,
}

#[derive(Debug, Deserialize)]
struct RawPlatform {
    os: String,
    arch: String,
}

#[derive(Debug, Deserialize)]
struct RawList {
    #[serde(rename = "type")]
    kind: String,
    url: Option<String>,
    prefix: Option<String>,
    exclude: Option<String>,
    #[serde(default = "default_version_from")]
    version_from: String,
    versions: Option<Vec<String>>,
    auth_env: Option<String>,
}

fn default_version_from() -> String {
    "tag_name".to_string()
}

#[derive(Debug, Deserialize)]
struct RawFetch {
    #[serde(rename = "type")]
    kind: String,
    url: Option<String>,
    urls: Option<Vec<String>>,
    auth_env: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawInstall {
    #[serde(rename = "type")]
    kind: String,
    binaries: Option<Vec<String>>,
}

impl RawEntry {
    fn into_entry(self) -> Result<CatalogEntry, String> {
        let list = match self.list.kind.as_str() {
            "github-releases" => ListStrategy::GithubReleases {
                url: self.list.url.ok_or("github-releases lister needs a url")?,
                prefix: self.list.prefix,
                exclude: self.list.exclude,
                version_from: self.list.version_from,
                auth_env: self.list.auth_env,
            },
            "gitlab-releases" => ListStrategy::GitlabReleases {
                url: self.list.url.ok_or("gitlab-releases lister needs a url")?,
                prefix: self.list.prefix,
                exclude: self.list.exclude,
                version_from: self.list.version_from,
                auth_env: self.list.auth_env,
            },
            "static" => ListStrategy::Static {
                versions: self.list.versions.unwrap_or_default(),
            },
            other => return Err(format!("unknown list type '{other}'")),
        };

        let fetch = match self.fetch.kind.as_str() {
            "download" | "direct" => {
                let urls = match (self.fetch.urls, self.fetch.url) {
                    (Some(urls), _) if !urls.is_empty() => urls,
                    (_, Some(url)) => vec![url],
                    _ => return Err("fetch strategy needs url or urls".to_string()),
                };
                FetchStrategy {
                    urls,
                    auth_env: self.fetch.auth_env,
                }
            }
            other => return Err(format!("unknown fetch type '{other}'")),
        };

        let install = match self.install.kind.as_str() {
            "direct" => InstallStrategy::Direct,
            "zip" => InstallStrategy::Zip {
                binaries: self.install.binaries.unwrap_or_default(),
            },
            "tgz" => InstallStrategy::Tgz {
                binaries: self.install.binaries.unwrap_or_default(),
            },
            "tbz" => InstallStrategy::Tbz {
                binaries: self.install.binaries.unwrap_or_default(),
            },
            "tarxz" => InstallStrategy::TarXz {
                binaries: self.install.binaries.unwrap_or_default(),
            },
            "gzip" => InstallStrategy::Gzip,
            "xz" => InstallStrategy::Xz,
            other => return Err(format!("unknown install type '{other}'")),
        };

        let platforms = self
            .platforms
            .map(|ps| ps.into_iter().map(|p| (p.os, p.arch)).collect());

        Ok(CatalogEntry {
            description: self.description,
            url: self.url,
            remap: self.remap,
            list,
            fetch,
            install,
            message: self.message,
            platforms,
            checksum: self.checksum,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
terraform:
  description: "Terraform CLI"
  list:
    type: github-releases
    url: "https://api.github.com/repos/hashicorp/terraform/releases"
    prefix: "v"
  fetch:
    type: download
    urls:
      - "https://releases.hashicorp.com/terraform/{{ NakedVersion }}/terraform_{{ NakedVersion }}_{{ OS }}_{{ Arch }}.zip"
  install:
    type: zip
    binaries:
      - "terraform{{ ExeExtension }}$"

broken:
  list:
    type: made-up-type
  fetch:
    type: download
    url: "https://example.com"
  install:
    type: direct
"#;

    #[test]
    fn parses_known_distribution_and_skips_unknown_strategy() {
        let catalog = Catalog::parse(SAMPLE).unwrap();
        assert!(catalog.get("terraform").is_some());
        assert!(catalog.get("broken").is_none());
        assert_eq!(catalog.skipped.len(), 1);
        assert_eq!(catalog.skipped[0].0, "broken");
    }

    #[test]
    fn platform_restriction_is_honored() {
        let entry = CatalogEntry {
            description: None,
            url: None,
            remap: RemapTable::default(),
            list: ListStrategy::Static { versions: vec![] },
            fetch: FetchStrategy {
                urls: vec![],
                auth_env: None,
            },
            install: InstallStrategy::Direct,
            message: None,
            platforms: Some(vec![("linux".to_string(), "amd64".to_string())]),
            checksum: None,
        };
        assert!(entry.supports("linux", "amd64"));
        assert!(!entry.supports("darwin", "arm64"));
    }
}
