//! Shim dispatcher (C11).
//!
//! Both a shim invocation (the process was exec'd under a
//! `<linkdir>/<distribution>` symlink) and the `expand` command resolve a
//! version the same way (SPEC_FULL.md §4.11a): only what happens with the
//! resolved binary path differs — one execs it, the other prints it.

use anyhow::{Context as _, Result};
use camino::Utf8PathBuf;

use crate::error::BinenvError;
use crate::layout::Layout;
use crate::resolver::{self, Resolution};

/// Resolve `distribution`'s version against the installed inventory,
/// walking from the current directory to the user's home (or one level
/// above it, per spec.md §4.9, when the caller is already outside it).
pub fn resolve_for_dispatch(distribution: &str, layout: &Layout) -> Result<Resolution, BinenvError> {
    let cwd = current_dir_utf8().map_err(|e| BinenvError::Unsatisfiable {
        distribution: distribution.to_string(),
        constraint: format!("unable to determine current directory: {e}"),
    })?;
    let stop_dir = home_dir_utf8().unwrap_or_else(|_| cwd.clone());
    let installed = layout.installed_versions(distribution);

    resolver::resolve(distribution, &cwd, &stop_dir, &installed)
}

fn current_dir_utf8() -> Result<Utf8PathBuf> {
    let cwd = std::env::current_dir().context("unable to read current directory")?;
    Utf8PathBuf::from_path_buf(cwd).map_err(|p| anyhow::anyhow!("current directory {:?} is not UTF-8", p))
}

fn home_dir_utf8() -> Result<Utf8PathBuf> {
    let home = directories::BaseDirs::new()
        .context("unable to determine home directory")?
        .home_dir()
        .to_path_buf();
    Utf8PathBuf::from_path_buf(home).map_err(|p| anyhow::anyhow!("home directory {:?} is not UTF-8", p))
}

/// Replace the current process image with the resolved binary for
/// `distribution`, preserving argv (minus argv[0]) and the environment.
/// Never returns on success; on failure (resolution or exec), returns the
/// error so the caller can report it and exit non-zero (spec.md §4.11:
/// "the shim path is all-or-nothing").
#[cfg(unix)]
pub fn exec_shim(distribution: &str, layout: &Layout) -> Result<()> {
    use std::os::unix::process::CommandExt as _;

    let resolution = resolve_for_dispatch(distribution, layout)?;
    let binary = layout.binary_path(distribution, &resolution.version.canonical());
    tracing::debug!("dispatching {distribution} -> {binary} ({:?})", resolution.origin);

    let args: Vec<std::ffi::OsString> = std::env::args_os().skip(1).collect();
    let err = std::process::Command::new(binary.as_std_path()).args(&args).exec();
    Err(anyhow::anyhow!("unable to exec {binary}: {err}"))
}

#[cfg(not(unix))]
pub fn exec_shim(distribution: &str, layout: &Layout) -> Result<()> {
    let resolution = resolve_for_dispatch(distribution, layout)?;
    let binary = layout.binary_path(distribution, &resolution.version.canonical());
    let args: Vec<std::ffi::OsString> = std::env::args_os().skip(1).collect();
    let status = std::process::Command::new(binary.as_std_path())
        .args(&args)
        .status()
        .with_context(|| format!("unable to run {binary}"))?;
    std::process::exit(status.code().unwrap_or(1));
}

/// The basename the current process was invoked under, e.g. `terraform`
/// for a call through `<linkdir>/terraform`.
pub fn invoked_name() -> String {
    std::env::args_os()
        .next()
        .map(std::path::PathBuf::from)
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| crate::SELF_NAME.to_string())
}
