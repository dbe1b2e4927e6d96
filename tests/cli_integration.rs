//! End-to-end tests driving the built `binenv` binary through `assert_cmd`,
//! each against an isolated directory layout so tests never touch a real
//! home directory or leave state behind.

use assert_cmd::Command;
use std::fs;
use tempfile::tempdir;

fn isolated_cmd(bindir: &std::path::Path, confdir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("binenv").unwrap();
    cmd.env("BINENV_BINDIR", bindir)
        .env("BINENV_LINKDIR", bindir)
        .env("BINENV_CACHEDIR", bindir)
        .env("BINENV_CONFDIR", confdir);
    cmd
}

const FIXTURE_CATALOG: &str = r#"
samplecli:
  description: a sample command line tool
  list:
    type: static
    versions:
      - "1.2.0"
      - "1.1.0"
  fetch:
    type: download
    url: "https://example.invalid/samplecli/{{ Version }}/samplecli-{{ OS }}-{{ Arch }}"
  install:
    type: direct
"#;

fn write_fixture_catalog(confdir: &std::path::Path) {
    fs::write(confdir.join("distributions.yaml"), FIXTURE_CATALOG).unwrap();
}

#[test]
fn version_prints_the_crate_version() {
    let home = tempdir().unwrap();
    let mut cmd = isolated_cmd(home.path(), home.path());
    cmd.arg("version");
    cmd.assert().success().stdout(predicates::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn expand_fails_cleanly_when_nothing_is_installed() {
    let home = tempdir().unwrap();
    let mut cmd = isolated_cmd(home.path(), home.path());
    cmd.args(["expand", "samplecli"]);
    cmd.assert().failure();
}

#[test]
fn local_pins_an_exact_version_and_is_idempotent_on_rewrite() {
    let home = tempdir().unwrap();
    let cwd = tempdir().unwrap();

    let mut first = isolated_cmd(home.path(), home.path());
    first.current_dir(cwd.path()).args(["local", "samplecli", "1.2.0"]);
    first.assert().success();

    let lock_path = cwd.path().join(".binenv.lock");
    let contents = fs::read_to_string(&lock_path).unwrap();
    assert!(contents.contains("samplecli=1.2.0"));

    let mut second = isolated_cmd(home.path(), home.path());
    second.current_dir(cwd.path()).args(["local", "samplecli", "1.1.0"]);
    second.assert().success();

    let contents = fs::read_to_string(&lock_path).unwrap();
    assert!(contents.contains("samplecli=1.1.0"));
    assert!(!contents.contains("1.2.0"));
}

#[test]
fn local_freeze_prints_an_empty_lock_file_with_nothing_installed() {
    let home = tempdir().unwrap();
    let mut cmd = isolated_cmd(home.path(), home.path());
    cmd.args(["local", "--freeze"]);
    cmd.assert().success();
}

#[test]
fn uninstall_without_any_version_requires_typed_confirmation() {
    let home = tempdir().unwrap();
    let mut cmd = isolated_cmd(home.path(), home.path());
    cmd.args(["uninstall", "samplecli"]).write_stdin("not-the-name\n");
    cmd.assert().failure();
}

#[test]
fn search_lists_distributions_from_a_local_catalog() {
    let home = tempdir().unwrap();
    write_fixture_catalog(home.path());

    let mut cmd = isolated_cmd(home.path(), home.path());
    cmd.args(["search", "sample"]);
    cmd.assert().success().stdout(predicates::str::contains("samplecli"));
}

#[test]
fn versions_prints_nothing_useful_without_a_prior_update() {
    let home = tempdir().unwrap();
    write_fixture_catalog(home.path());

    let mut cmd = isolated_cmd(home.path(), home.path());
    cmd.args(["versions", "samplecli"]);
    cmd.assert().success();
}

/// Exercises the real network path: fetching the default catalog and
/// installing a real distribution. Run judiciously.
#[cfg(feature = "network-integration")]
mod network {
    use super::*;

    #[test]
    fn install_fetches_the_default_catalog_and_installs_a_small_tool() {
        let home = tempdir().unwrap();
        let mut cmd = isolated_cmd(home.path(), home.path());
        cmd.args(["install", "jq"]);
        cmd.assert().success();
    }
}
