//! Directory layout & self-install (C12).
//!
//! Computes `bindir`/`linkdir`/`cachedir`/`configdir` for user mode (via
//! `directories::ProjectDirs`, as the teacher resolves its own home
//! directory) or global mode (hardcoded `/var`/`/usr/local/bin` paths, since
//! `ProjectDirs` has no "system" notion).

use anyhow::{Context as _, Result};
use camino::Utf8PathBuf;
use directories::ProjectDirs;

/// Resolved set of directories the core operates against.
#[derive(Debug, Clone)]
pub struct Layout {
    pub bindir: Utf8PathBuf,
    pub linkdir: Utf8PathBuf,
    pub cachedir: Utf8PathBuf,
    pub configdir: Utf8PathBuf,
    pub global: bool,
}

/// Explicit overrides, one per directory, taken from CLI flags or
/// `BINENV_BINDIR`/`BINENV_LINKDIR`/`BINENV_CACHEDIR`/`BINENV_CONFDIR`.
#[derive(Debug, Clone, Default)]
pub struct LayoutOverrides {
    pub bindir: Option<Utf8PathBuf>,
    pub linkdir: Option<Utf8PathBuf>,
    pub cachedir: Option<Utf8PathBuf>,
    pub configdir: Option<Utf8PathBuf>,
}

impl LayoutOverrides {
    /// Read overrides from `BINENV_BINDIR`/`BINENV_LINKDIR`/`BINENV_CACHEDIR`/
    /// `BINENV_CONFDIR`, for shim dispatch, which never goes through `clap`.
    pub fn from_env() -> Self {
        Self {
            bindir: env_path("BINENV_BINDIR"),
            linkdir: env_path("BINENV_LINKDIR"),
            cachedir: env_path("BINENV_CACHEDIR"),
            configdir: env_path("BINENV_CONFDIR"),
        }
    }
}

fn env_path(key: &str) -> Option<Utf8PathBuf> {
    std::env::var_os(key).map(std::path::PathBuf::from).and_then(|p| Utf8PathBuf::from_path_buf(p).ok())
}

impl Layout {
    pub fn resolve(global: bool, overrides: LayoutOverrides) -> Result<Self> {
        let (bindir, linkdir, cachedir, configdir) = if global {
            (
                Utf8PathBuf::from("/var/lib/binenv"),
                Utf8PathBuf::from("/usr/local/bin"),
                Utf8PathBuf::from("/var/cache/binenv"),
                Utf8PathBuf::from("/var/lib/binenv/config"),
            )
        } else {
            let home = dirs_home()?;
            let dirs = ProjectDirs::from("", "", "binenv")
                .context("unable to determine platform configuration directories")?;
            let cachedir = Utf8PathBuf::from_path_buf(dirs.cache_dir().to_path_buf())
                .map_err(|p| anyhow::anyhow!("cache dir {:?} is not UTF-8", p))?;
            let configdir = Utf8PathBuf::from_path_buf(dirs.config_dir().to_path_buf())
                .map_err(|p| anyhow::anyhow!("config dir {:?} is not UTF-8", p))?;
            let bindir = home.join(".binenv");
            (bindir.clone(), bindir, cachedir, configdir)
        };

        Ok(Self {
            bindir: overrides.bindir.unwrap_or(bindir),
            linkdir: overrides.linkdir.unwrap_or(linkdir),
            cachedir: overrides.cachedir.unwrap_or(cachedir),
            configdir: overrides.configdir.unwrap_or(configdir),
            global,
        })
    }

    pub fn shim_path(&self) -> Utf8PathBuf {
        self.bindir.join("shim")
    }

    pub fn binary_dir(&self, distribution: &str) -> Utf8PathBuf {
        self.bindir.join("binaries").join(distribution)
    }

    pub fn binary_path(&self, distribution: &str, version: &str) -> Utf8PathBuf {
        self.binary_dir(distribution).join(version)
    }

    pub fn link_path(&self, distribution: &str) -> Utf8PathBuf {
        self.linkdir.join(distribution)
    }

    pub fn cache_file(&self) -> Utf8PathBuf {
        self.cachedir.join("cache.json")
    }

    pub fn catalog_file(&self) -> Utf8PathBuf {
        self.configdir.join("distributions.yaml")
    }

    /// Enumerate the installed-version inventory for `distribution` by
    /// listing directory entries under `binaries/<distribution>/`,
    /// descending, dropping anything that doesn't parse as a version
    /// (spec.md §3: "derived at each call by enumerating directory
    /// entries").
    pub fn installed_versions(&self, distribution: &str) -> Vec<crate::version::Version> {
        let dir = self.binary_dir(distribution);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };

        let raw = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().into_string().ok());
        crate::version::sort_descending_dropping_invalid(raw)
    }

    /// Permission bits applied to installed binaries and the shim.
    pub fn executable_mode(&self) -> u32 {
        if self.global {
            0o755
        } else {
            0o750
        }
    }

    /// Atomically copy the running executable to `<bindir>/shim`: write to a
    /// sibling `.new` file then rename over the target, matching the
    /// write-then-rename pattern spec.md §5 requires for the shim.
    pub fn self_install(&self) -> Result<()> {
        std::fs::create_dir_all(&self.bindir)
            .with_context(|| format!("unable to create bindir {}", self.bindir))?;

        let current_exe = std::env::current_exe().context("unable to locate current executable")?;
        let shim = self.shim_path();
        let staging = shim.with_extension("new");

        std::fs::copy(&current_exe, &staging)
            .with_context(|| format!("unable to copy self to {staging}"))?;
        set_executable(&staging, self.executable_mode())?;
        std::fs::rename(&staging, &shim)
            .with_context(|| format!("unable to rename {staging} to {shim}"))?;

        Ok(())
    }
}

#[cfg(unix)]
pub fn set_executable(path: &Utf8PathBuf, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt as _;
    let perm = std::fs::Permissions::from_mode(mode);
    std::fs::set_permissions(path, perm)
        .with_context(|| format!("unable to set permissions on {path}"))?;
    Ok(())
}

#[cfg(not(unix))]
pub fn set_executable(_path: &Utf8PathBuf, _mode: u32) -> Result<()> {
    Ok(())
}

fn dirs_home() -> Result<Utf8PathBuf> {
    let home = directories::BaseDirs::new()
        .context("unable to determine home directory")?
        .home_dir()
        .to_path_buf();
    Utf8PathBuf::from_path_buf(home).map_err(|p| anyhow::anyhow!("home dir {:?} is not UTF-8", p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_layout_uses_var_paths() {
        let layout = Layout::resolve(true, LayoutOverrides::default()).unwrap();
        assert_eq!(layout.bindir, Utf8PathBuf::from("/var/lib/binenv"));
        assert_eq!(layout.linkdir, Utf8PathBuf::from("/usr/local/bin"));
        assert_eq!(layout.cachedir, Utf8PathBuf::from("/var/cache/binenv"));
    }

    #[test]
    fn overrides_win_over_defaults() {
        let overrides = LayoutOverrides {
            bindir: Some(Utf8PathBuf::from("/tmp/custom-bin")),
            ..Default::default()
        };
        let layout = Layout::resolve(true, overrides).unwrap();
        assert_eq!(layout.bindir, Utf8PathBuf::from("/tmp/custom-bin"));
        // unrelated directories are untouched
        assert_eq!(layout.linkdir, Utf8PathBuf::from("/usr/local/bin"));
    }

    #[test]
    fn installed_versions_lists_and_sorts_descending() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let overrides = LayoutOverrides {
            bindir: Some(root),
            ..Default::default()
        };
        let layout = Layout::resolve(true, overrides).unwrap();
        let binaries_dir = layout.binary_dir("terraform");
        std::fs::create_dir_all(binaries_dir.join("1.4.0")).unwrap();
        std::fs::create_dir_all(binaries_dir.join("1.5.7")).unwrap();

        let versions: Vec<_> = layout
            .installed_versions("terraform")
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(versions, vec!["1.5.7", "1.4.0"]);
    }

    #[test]
    fn installed_versions_is_empty_when_directory_missing() {
        let layout = Layout::resolve(true, LayoutOverrides::default()).unwrap();
        assert!(layout.installed_versions("never-installed").is_empty());
    }

    #[test]
    fn binary_path_nests_under_bindir() {
        let layout = Layout::resolve(true, LayoutOverrides::default()).unwrap();
        assert_eq!(
            layout.binary_path("terraform", "1.5.7"),
            Utf8PathBuf::from("/var/lib/binenv/binaries/terraform/1.5.7")
        );
    }
}
