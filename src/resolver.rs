//! Constraint resolver (C9).
//!
//! Decides which installed version of a distribution a shim invocation (or
//! `expand`) should use: env override, then the nearest `.binenv.lock` found
//! walking up from the CWD, then the highest installed version.

use camino::{Utf8Path, Utf8PathBuf};

use crate::constraint::split_distribution_and_expr;
use crate::error::BinenvError;
use crate::lockfile::{self, env_override_constraint, LockFile};
use crate::version::Version;

/// Why a given version was selected, surfaced to the user in `expand`
/// output and log messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    EnvOverride,
    LockFile(Utf8PathBuf),
    Default,
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub version: Version,
    pub origin: Origin,
}

/// Resolve `distribution`'s version starting the walk at `cwd`, stopping
/// (inclusive) at `stop_dir`, against the given descending-sorted inventory
/// of installed versions.
pub fn resolve(
    distribution: &str,
    cwd: &Utf8Path,
    stop_dir: &Utf8Path,
    installed: &[Version],
) -> Result<Resolution, BinenvError> {
    if let Some(version) = env_override(distribution, installed) {
        return Ok(Resolution {
            version,
            origin: Origin::EnvOverride,
        });
    }

    if let Some(found) = walk_for_lock(distribution, cwd, stop_dir, installed)? {
        return Ok(found);
    }

    if installed.is_empty() {
        return Err(BinenvError::Unsatisfiable {
            distribution: distribution.to_string(),
            constraint: "no installed versions".to_string(),
        });
    }

    Ok(Resolution {
        version: installed[0].clone(),
        origin: Origin::Default,
    })
}

fn env_override(distribution: &str, installed: &[Version]) -> Option<Version> {
    let constraint = env_override_constraint(distribution)?;
    installed.iter().find(|v| constraint.matches(v)).cloned()
}

/// Walk from `cwd` up to and including `stop_dir`, looking for
/// `.binenv.lock`. The walk is robust to `stop_dir` being above `cwd`'s
/// ancestry (it simply never matches) or being the filesystem root.
fn walk_for_lock(
    distribution: &str,
    cwd: &Utf8Path,
    stop_dir: &Utf8Path,
    installed: &[Version],
) -> Result<Option<Resolution>, BinenvError> {
    let mut current = Some(cwd.to_path_buf());
    let mut past_stop = false;

    while let Some(dir) = current {
        let candidate = dir.join(".binenv.lock");
        if candidate.is_file() {
            let lock = LockFile::read_from(&candidate).map_err(|e| BinenvError::Unsatisfiable {
                distribution: distribution.to_string(),
                constraint: format!("unreadable lock file {candidate}: {e}"),
            })?;
            if let Some(constraint) = lock.entry_for(distribution) {
                let version = lockfile::solve(distribution, constraint, installed)?;
                return Ok(Some(Resolution {
                    version,
                    origin: Origin::LockFile(candidate),
                }));
            }
        }

        if past_stop {
            break;
        }
        if dir == stop_dir {
            past_stop = true;
        }
        current = dir.parent().map(Utf8Path::to_path_buf);
    }

    Ok(None)
}

/// Split a raw lock-file record into its distribution name, re-exported
/// here so callers working at this layer don't need to reach into
/// `crate::constraint` directly.
pub fn distribution_name(record: &str) -> Option<&str> {
    split_distribution_and_expr(record).map(|(d, _)| d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn defaults_to_highest_installed_when_no_lock_found() {
        let dir = tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let installed = vec![v("1.28.3"), v("1.27.10")];

        let res = resolve("kubectl", root, root, &installed).unwrap();
        assert_eq!(res.version, v("1.28.3"));
        assert_eq!(res.origin, Origin::Default);
    }

    #[test]
    fn fails_when_inventory_is_empty() {
        let dir = tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let err = resolve("kubectl", root, root, &[]).unwrap_err();
        assert!(matches!(err, BinenvError::Unsatisfiable { .. }));
    }

    #[test]
    fn finds_lock_file_walking_up_from_a_subdirectory() {
        let dir = tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let sub = root.join("a").join("b");
        fs::create_dir_all(&sub).unwrap();
        fs::write(root.join(".binenv.lock"), "kubectl~>1.27\n").unwrap();

        let installed = vec![v("1.28.3"), v("1.27.10"), v("1.27.1")];
        let res = resolve("kubectl", &sub, root, &installed).unwrap();
        assert_eq!(res.version, v("1.27.10"));
        assert_eq!(res.origin, Origin::LockFile(root.join(".binenv.lock")));
    }

    #[test]
    fn unsatisfiable_lock_constraint_fails_without_falling_back() {
        let dir = tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        fs::write(root.join(".binenv.lock"), "terraform>=2.0.0\n").unwrap();

        let installed = vec![v("1.5.7"), v("1.4.0")];
        let err = resolve("terraform", root, root, &installed).unwrap_err();
        assert!(matches!(err, BinenvError::Unsatisfiable { .. }));
    }

    #[test]
    fn env_override_wins_over_lock_file() {
        let dir = tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        fs::write(root.join(".binenv.lock"), "kubectl~>1.28\n").unwrap();

        std::env::set_var("BINENV_KUBECTL_VERSION", "1.27.1");
        let installed = vec![v("1.28.3"), v("1.27.1")];
        let res = resolve("kubectl", root, root, &installed).unwrap();
        std::env::remove_var("BINENV_KUBECTL_VERSION");

        assert_eq!(res.version, v("1.27.1"));
        assert_eq!(res.origin, Origin::EnvOverride);
    }

    #[test]
    fn walk_terminates_when_stop_dir_is_above_cwd_ancestry() {
        let dir = tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let unrelated_stop = root.join("never-an-ancestor");
        let installed = vec![v("1.0.0")];

        let res = resolve("kubectl", root, &unrelated_stop, &installed).unwrap();
        assert_eq!(res.origin, Origin::Default);
    }
}
