//! End-to-end tests for the `sync` command and the CLI surface.

#[macro_use]
mod common;

use common::prelude::*;

fn role_sync() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("role-sync");
    for var in [
        "ROLE_SYNC_CONFIG",
        "ROLE_SYNC_CACHE",
        "ROLE_SYNC_INSTANCE",
        "ROLE_SYNC_PROJECT_ROOT",
        "ROLE_SYNC_LOG_LEVEL",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_help_lists_commands() {
    role_sync()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sync"))
        .stdout(predicate::str::contains("materialize"))
        .stdout(predicate::str::contains("--log-level"));
}

#[test]
fn test_version_flag() {
    role_sync()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("role-sync"));
}

#[test]
fn test_invalid_log_level_is_rejected() {
    role_sync()
        .args(["--log-level", "loud", "sync"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("loud"));
}

#[test]
fn test_missing_config_file() {
    let fixture = TestFixture::new();
    role_sync()
        .current_dir(fixture.path())
        .arg("sync")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration file not found"));
}

#[test]
fn test_malformed_dependency_is_reported() {
    let fixture = TestFixture::new().with_config(
        r#"
dependencies:
  - name: roleA
    repo: git
"#,
    );
    role_sync()
        .current_dir(fixture.path())
        .arg("sync")
        .assert()
        .failure()
        .stderr(predicate::str::contains("'repo' requires a 'url'"));
}

#[test]
fn test_missing_path_warns_and_succeeds() {
    let fixture = TestFixture::new().with_config(
        r#"
dependencies:
  - name: common
    path: src/common
"#,
    );
    let cache = fixture.path().join("cache");

    role_sync()
        .current_dir(fixture.path())
        .args(["sync", "--cache-root"])
        .arg(&cache)
        .assert()
        .success()
        .stderr(predicate::str::contains("doesn't exist"))
        .stdout(predicate::str::contains("1 dependencies synchronized"));

    assert!(!cache.join("common").exists());
}

#[test]
fn test_sync_clones_and_reports_json() {
    require_git!();
    let fixture = TestFixture::new();
    let remote = GitRemote::new(&fixture.path().join("remote"));
    let v1 = remote.commit_file("tasks/main.yml", "---\n", "initial");
    remote.tag("v1.0");
    fixture
        .child(".role-sync.yml")
        .write_str(&format!(
            "dependencies:\n  - name: roleA\n    repo: git\n    url: {}\n    ref: v1.0\n",
            remote.url()
        ))
        .unwrap();
    let cache = fixture.path().join("cache");

    let output = role_sync()
        .current_dir(fixture.path())
        .args(["sync", "--json", "--cache-root"])
        .arg(&cache)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let outcome = &report["outcomes"][0];
    assert_eq!(outcome["name"], "roleA");
    assert_eq!(outcome["repo"]["action"]["action"], "cloned_fresh");
    assert_eq!(outcome["repo"]["commit"], v1.as_str());
    assert_eq!(head_of(&cache.join("roleA")), v1);
}

#[test]
fn test_default_cache_is_instance_dependency_dir() {
    let fixture = TestFixture::new()
        .with_file("shared/common/tasks/main.yml", "---\n")
        .with_config(
            r#"
instance: default-ubuntu
dependencies:
  - name: common
    path: shared/common
"#,
        );

    role_sync()
        .current_dir(fixture.path())
        .arg("sync")
        .assert()
        .success();

    fixture
        .child(".kitchen/yansible/dependencies/default-ubuntu/common/tasks/main.yml")
        .assert(predicate::path::is_file());
}

#[test]
fn test_bad_reference_fails_with_dependency_name() {
    require_git!();
    let fixture = TestFixture::new();
    let remote = GitRemote::new(&fixture.path().join("remote"));
    remote.commit_file("tasks/main.yml", "---\n", "initial");
    fixture
        .child("deps.yml")
        .write_str(&format!(
            "- name: roleA\n  repo: git\n  url: {}\n  ref: v9.9\n",
            remote.url()
        ))
        .unwrap();

    role_sync()
        .current_dir(fixture.path())
        .args(["sync", "--config", "deps.yml", "--cache-root", "cache"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid reference 'v9.9'"))
        .stderr(predicate::str::contains("'roleA'"));
}
