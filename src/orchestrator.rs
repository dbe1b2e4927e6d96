//! Install orchestrator (C10).
//!
//! Ties the catalog (C6), fetcher (C4), installer (C5) and directory layout
//! (C12) together into the operations the CLI exposes: `install`,
//! `install_from_lock`, `uninstall`, `upgrade`, `update`. Single-pair
//! `install` follows the ordering spec.md §5 requires: platform-check →
//! fetch → extract → place → shim/symlink.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use camino::Utf8PathBuf;
use reqwest::Client;
use tokio::sync::{mpsc, Mutex as AsyncMutex};

use crate::cache::Cache;
use crate::catalog::list::{ListOutcome, ListStrategy};
use crate::catalog::template::TemplateContext;
use crate::catalog::Catalog;
use crate::error::BinenvError;
use crate::layout::Layout;
use crate::lockfile::{self, LockFile};
use crate::version::Version;

/// Canonical name this tool registers itself under in the catalog; installing
/// it triggers self-install (spec.md §4.10 step 6) instead of a plain place.
pub const TOOL_NAME: &str = "binenv";

#[derive(Debug, Clone)]
pub struct InstallOutcome {
    pub distribution: String,
    pub version: Version,
    pub message: Option<String>,
}

/// Install `distribution` at `version` (or the highest non-prerelease
/// candidate if absent). `AlreadyInstalled` is returned as an `Err` so batch
/// callers can branch on `BinenvError::is_soft()`, but it is not a failure
/// of the pipeline itself.
pub async fn install(
    layout: &Layout,
    catalog: &Catalog,
    cache: &Cache,
    client: &Client,
    distribution: &str,
    version: Option<&str>,
    dry_run: bool,
) -> Result<InstallOutcome, BinenvError> {
    let entry = catalog
        .get(distribution)
        .ok_or_else(|| BinenvError::UnknownDistribution(distribution.to_string()))?;

    let os = crate::catalog::remap::canonical_os();
    let arch = crate::catalog::remap::canonical_arch();
    if !entry.supports(&os, &arch) {
        return Err(BinenvError::UnsupportedPlatform {
            distribution: distribution.to_string(),
            os,
            arch,
        });
    }

    let version = match version {
        Some(v) => Version::parse(v).map_err(|e| BinenvError::Unsatisfiable {
            distribution: distribution.to_string(),
            constraint: e.to_string(),
        })?,
        None => cache
            .get(distribution)
            .iter()
            .find(|v| !v.is_prerelease())
            .cloned()
            .ok_or_else(|| BinenvError::NoStableVersion(distribution.to_string()))?,
    };

    let already_installed = layout
        .installed_versions(distribution)
        .iter()
        .any(|v| v == &version);
    if already_installed {
        return Err(BinenvError::AlreadyInstalled {
            distribution: distribution.to_string(),
            version: version.canonical(),
        });
    }

    if dry_run {
        tracing::info!("dry run: would install {distribution} {version}");
        return Ok(InstallOutcome {
            distribution: distribution.to_string(),
            version,
            message: None,
        });
    }

    let ctx = TemplateContext::new(&version, &entry.remap);
    let version_label = version.canonical();

    let src = entry
        .fetch
        .fetch(client, distribution, &version_label, &ctx)
        .await?;

    if let Some(checksum) = &entry.checksum {
        if let Err(e) = crate::checksum::verify(checksum, client, distribution, &version_label, &src, &ctx).await {
            let _ = std::fs::remove_file(&src);
            return Err(e);
        }
    }

    let dst_dir = layout.binary_dir(distribution);
    std::fs::create_dir_all(&dst_dir)
        .with_context(|| format!("unable to create {dst_dir}"))
        .map_err(|e| BinenvError::ArchiveError(e.to_string()))?;
    let dst = layout.binary_path(distribution, &version_label);

    entry
        .install
        .install(distribution, &version_label, &src, &dst, layout.executable_mode(), &ctx)?;
    let _ = std::fs::remove_file(&src);

    if distribution == TOOL_NAME {
        layout
            .self_install()
            .map_err(|e| BinenvError::ArchiveError(e.to_string()))?;
    }

    ensure_symlink(layout, distribution).map_err(|e| BinenvError::ArchiveError(e.to_string()))?;

    Ok(InstallOutcome {
        distribution: distribution.to_string(),
        version,
        message: entry.message.clone(),
    })
}

/// Create or repair `<linkdir>/<distribution> -> <bindir>/shim`, via
/// write-to-temp-then-rename (spec.md §5: "the shim and symlink writes use
/// write-to-temp-then-rename").
#[cfg(unix)]
fn ensure_symlink(layout: &Layout, distribution: &str) -> Result<()> {
    use std::os::unix::fs::symlink;

    let link = layout.link_path(distribution);
    let target = layout.shim_path();

    if let Ok(existing) = std::fs::read_link(link.as_std_path()) {
        if existing == *target.as_std_path() {
            return Ok(());
        }
    }

    let staging = Utf8PathBuf::from(format!("{link}.new"));
    let _ = std::fs::remove_file(&staging);
    symlink(target.as_std_path(), staging.as_std_path())
        .with_context(|| format!("unable to create symlink {staging}"))?;
    std::fs::rename(&staging, &link).with_context(|| format!("unable to rename {staging} to {link}"))?;
    Ok(())
}

#[cfg(not(unix))]
fn ensure_symlink(_layout: &Layout, _distribution: &str) -> Result<()> {
    Ok(())
}

/// Parse `.binenv.lock` in `cwd` and install whatever it resolves to that
/// isn't already installed; candidates come from the C7 cache, not only the
/// installed inventory, so a lock file can pull in a version never seen on
/// this host before.
pub async fn install_from_lock(
    layout: &Layout,
    catalog: &Catalog,
    cache: &Cache,
    client: &Client,
    cwd: &camino::Utf8Path,
    dry_run: bool,
) -> Vec<(String, Result<InstallOutcome, BinenvError>)> {
    let lock_path = cwd.join(".binenv.lock");
    let lock = match LockFile::read_from(&lock_path) {
        Ok(lock) => lock,
        Err(e) => {
            tracing::warn!("unable to read {lock_path}: {e}");
            return Vec::new();
        }
    };

    let mut results = Vec::new();
    for distribution in lock.distributions() {
        let Some(constraint) = lock.entry_for(distribution) else {
            continue;
        };
        let candidates = cache.get(distribution);
        let resolved = lockfile::solve(distribution, constraint, candidates);
        let outcome = match resolved {
            Ok(version) => {
                install(layout, catalog, cache, client, distribution, Some(&version.canonical()), dry_run).await
            }
            Err(e) => Err(e),
        };
        results.push((distribution.to_string(), outcome));
    }
    results
}

/// Remove one installed version (defensively re-parsing it as a semver
/// first), or every installed version plus the symlink when `version` is
/// `None` — the caller is responsible for having obtained the typed
/// confirmation spec.md §4.10 requires for the latter before calling with
/// `confirmed: true`.
pub fn uninstall(layout: &Layout, distribution: &str, version: Option<&str>, confirmed: bool) -> Result<()> {
    match version {
        Some(raw) => {
            let version = Version::parse(raw).context("refusing to uninstall: not a valid version")?;
            let path = layout.binary_path(distribution, &version.canonical());
            std::fs::remove_file(&path).with_context(|| format!("unable to remove {path}"))?;
            Ok(())
        }
        None => {
            anyhow::ensure!(confirmed, "uninstalling every version of '{distribution}' requires confirmation");
            for version in layout.installed_versions(distribution) {
                let path = layout.binary_path(distribution, &version.canonical());
                std::fs::remove_file(&path).with_context(|| format!("unable to remove {path}"))?;
            }
            let link = layout.link_path(distribution);
            match std::fs::remove_file(&link) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e).with_context(|| format!("unable to remove symlink {link}")),
            }
            Ok(())
        }
    }
}

#[derive(Debug, Default)]
pub struct UpgradeReport {
    pub upgraded: Vec<(String, Version)>,
    pub already_current: Vec<String>,
    pub failed: Vec<(String, BinenvError)>,
}

/// Install the highest stable candidate for every distribution that
/// currently has at least one installed version. Failures are aggregated;
/// when `ignore_errors` is false, the first hard failure stops the batch.
pub async fn upgrade(
    layout: &Layout,
    catalog: &Catalog,
    cache: &Cache,
    client: &Client,
    ignore_errors: bool,
) -> UpgradeReport {
    let mut report = UpgradeReport::default();

    for distribution in catalog.distributions() {
        if layout.installed_versions(distribution).is_empty() {
            continue;
        }

        match install(layout, catalog, cache, client, distribution, None, false).await {
            Ok(outcome) => report.upgraded.push((distribution.to_string(), outcome.version)),
            Err(e) if matches!(e, BinenvError::AlreadyInstalled { .. }) => {
                report.already_current.push(distribution.to_string());
            }
            Err(e) => {
                report.failed.push((distribution.to_string(), e));
                if !ignore_errors {
                    break;
                }
            }
        }
    }

    report
}

pub enum UpdateMode {
    /// Query each distribution's lister directly, concurrently.
    Local,
    /// Download one prebuilt cache snapshot covering every distribution.
    Cache { url: String },
}

/// Refresh the version cache. `Local` fans out across a fixed worker pool
/// per spec.md §5; `Cache` replaces the whole cache from one downloaded
/// snapshot.
pub async fn update(
    catalog: &Catalog,
    cache: &mut Cache,
    client: &Client,
    mode: UpdateMode,
    distributions: Option<&[String]>,
    concurrency: usize,
    per_task_timeout: Duration,
) -> Result<Vec<(String, BinenvError)>> {
    match mode {
        UpdateMode::Cache { url } => {
            let snapshot: Cache = client
                .get(&url)
                .send()
                .await
                .context("unable to fetch cache snapshot")?
                .error_for_status()
                .context("cache snapshot fetch returned an error status")?
                .json()
                .await
                .context("unable to parse cache snapshot")?;
            *cache = snapshot;
            Ok(Vec::new())
        }
        UpdateMode::Local => {
            let wanted: Vec<&str> = match distributions {
                Some(names) => names.iter().map(String::as_str).collect(),
                None => catalog.distributions().collect(),
            };
            let jobs: Vec<(String, ListStrategy)> = wanted
                .into_iter()
                .filter_map(|name| catalog.get(name).map(|entry| (name.to_string(), entry.list.clone())))
                .collect();

            Ok(update_local(cache, client, jobs, concurrency, per_task_timeout).await)
        }
    }
}

async fn update_local(
    cache: &mut Cache,
    client: &Client,
    jobs: Vec<(String, ListStrategy)>,
    concurrency: usize,
    per_task_timeout: Duration,
) -> Vec<(String, BinenvError)> {
    let total = jobs.len();
    if total == 0 {
        return Vec::new();
    }

    let (work_tx, work_rx) = mpsc::channel::<(String, ListStrategy)>(total);
    for job in jobs {
        if work_tx.send(job).await.is_err() {
            break;
        }
    }
    drop(work_tx);
    let work_rx = Arc::new(AsyncMutex::new(work_rx));

    let (result_tx, mut result_rx) = mpsc::channel::<(String, Result<ListOutcome, BinenvError>)>(total);

    let worker_count = concurrency.max(1).min(total);
    let mut workers = Vec::with_capacity(worker_count);
    for _ in 0..worker_count {
        let work_rx = Arc::clone(&work_rx);
        let result_tx = result_tx.clone();
        let client = client.clone();
        workers.push(tokio::spawn(async move {
            loop {
                let job = {
                    let mut rx = work_rx.lock().await;
                    rx.recv().await
                };
                let Some((distribution, strategy)) = job else {
                    break;
                };

                let outcome = match tokio::time::timeout(per_task_timeout, strategy.list(&client)).await {
                    Ok(Ok(outcome)) => Ok(outcome),
                    Ok(Err(e)) => Err(BinenvError::FetchError {
                        distribution: distribution.clone(),
                        version: "*".to_string(),
                        message: e.to_string(),
                    }),
                    Err(_) => Err(BinenvError::FetchError {
                        distribution: distribution.clone(),
                        version: "*".to_string(),
                        message: "timed out listing versions".to_string(),
                    }),
                };

                if result_tx.send((distribution, outcome)).await.is_err() {
                    break;
                }
            }
        }));
    }
    drop(result_tx);

    let mut failures = Vec::new();
    let mut received = 0;
    while received < total {
        let Some((distribution, outcome)) = result_rx.recv().await else {
            break;
        };
        received += 1;
        match outcome {
            Ok(list_outcome) => {
                if let Some(warning) = list_outcome.warning {
                    tracing::warn!("listing {distribution} hit a soft limit: {warning}");
                    failures.push((distribution.clone(), warning));
                }
                cache.refresh(&distribution, list_outcome.versions);
            }
            Err(e) => {
                tracing::warn!("listing {distribution} failed: {e}");
                failures.push((distribution, e));
            }
        }
    }

    for worker in workers {
        let _ = worker.await;
    }

    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fetch::FetchStrategy;
    use crate::catalog::install::InstallStrategy;
    use crate::catalog::remap::RemapTable;
    use crate::catalog::CatalogEntry;
    use crate::layout::LayoutOverrides;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn layout_in(dir: &std::path::Path) -> Layout {
        let root = Utf8PathBuf::from_path_buf(dir.to_path_buf()).unwrap();
        Layout::resolve(
            true,
            LayoutOverrides {
                bindir: Some(root.clone()),
                linkdir: Some(root),
                ..Default::default()
            },
        )
        .unwrap()
    }

    fn direct_entry() -> CatalogEntry {
        CatalogEntry {
            description: None,
            url: None,
            remap: RemapTable::default(),
            list: ListStrategy::Static {
                versions: vec!["1.5.7".to_string()],
            },
            fetch: FetchStrategy {
                urls: vec![],
                auth_env: None,
            },
            install: InstallStrategy::Direct,
            message: Some("installed!".to_string()),
            platforms: None,
            checksum: None,
        }
    }

    #[tokio::test]
    async fn install_rejects_unknown_distribution() {
        let dir = tempdir().unwrap();
        let layout = layout_in(dir.path());
        let catalog = Catalog::default();
        let cache = Cache::default();
        let client = Client::new();

        let err = install(&layout, &catalog, &cache, &client, "nope", Some("1.0.0"), false)
            .await
            .unwrap_err();
        assert!(matches!(err, BinenvError::UnknownDistribution(_)));
    }

    #[tokio::test]
    async fn install_reports_already_installed_without_touching_network() {
        let dir = tempdir().unwrap();
        let layout = layout_in(dir.path());
        std::fs::create_dir_all(layout.binary_dir("terraform")).unwrap();
        std::fs::write(layout.binary_path("terraform", "1.5.7"), b"x").unwrap();

        let mut entries = HashMap::new();
        entries.insert("terraform".to_string(), direct_entry());
        let catalog = Catalog::from_entries(entries);
        let mut cache = Cache::default();
        cache.refresh("terraform", vec!["1.5.7".to_string()]);
        let client = Client::new();

        let err = install(&layout, &catalog, &cache, &client, "terraform", None, false)
            .await
            .unwrap_err();
        assert!(matches!(err, BinenvError::AlreadyInstalled { .. }));
    }

    #[tokio::test]
    async fn dry_run_install_does_not_create_binary() {
        let dir = tempdir().unwrap();
        let layout = layout_in(dir.path());
        let mut entries = HashMap::new();
        entries.insert("terraform".to_string(), direct_entry());
        let catalog = Catalog::from_entries(entries);
        let mut cache = Cache::default();
        cache.refresh("terraform", vec!["1.5.7".to_string()]);
        let client = Client::new();

        let outcome = install(&layout, &catalog, &cache, &client, "terraform", None, true)
            .await
            .unwrap();
        assert_eq!(outcome.version.canonical(), "1.5.7");
        assert!(!layout.binary_path("terraform", "1.5.7").exists());
    }

    #[test]
    fn uninstall_all_requires_confirmation() {
        let dir = tempdir().unwrap();
        let layout = layout_in(dir.path());
        let err = uninstall(&layout, "terraform", None, false).unwrap_err();
        assert!(err.to_string().contains("confirmation"));
    }

    #[test]
    fn uninstall_single_version_removes_the_file() {
        let dir = tempdir().unwrap();
        let layout = layout_in(dir.path());
        std::fs::create_dir_all(layout.binary_dir("terraform")).unwrap();
        let path = layout.binary_path("terraform", "1.5.7");
        std::fs::write(&path, b"x").unwrap();

        uninstall(&layout, "terraform", Some("1.5.7"), false).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn uninstall_rejects_non_version_argument() {
        let dir = tempdir().unwrap();
        let layout = layout_in(dir.path());
        let err = uninstall(&layout, "terraform", Some("not-a-version"), false).unwrap_err();
        assert!(err.to_string().contains("not a valid version"));
    }

    #[tokio::test]
    async fn update_local_populates_cache_from_static_listers() {
        let mut entries = HashMap::new();
        entries.insert(
            "terraform".to_string(),
            CatalogEntry {
                list: ListStrategy::Static {
                    versions: vec!["1.5.7".to_string(), "1.4.0".to_string()],
                },
                ..direct_entry()
            },
        );
        let catalog = Catalog::from_entries(entries);
        let mut cache = Cache::default();
        let client = Client::new();

        let failures = update(
            &catalog,
            &mut cache,
            &client,
            UpdateMode::Local,
            None,
            8,
            Duration::from_secs(1),
        )
        .await
        .unwrap();

        assert!(failures.is_empty());
        assert_eq!(cache.get("terraform").len(), 2);
    }
}
