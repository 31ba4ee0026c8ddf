use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn aquaform() -> Command {
    Command::cargo_bin("aquaform").unwrap()
}

#[test]
fn test_model_init_plan_flow() {
    let dir = TempDir::new().unwrap();

    aquaform()
        .current_dir(dir.path())
        .args(["model"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Generated model config"));
    assert!(dir.path().join("aqua.model.yaml").exists());

    aquaform()
        .current_dir(dir.path())
        .args(["init"])
        .assert()
        .success();
    assert!(dir.path().join("aqua.state.json").exists());

    // aqua.model.yaml matches the discovery glob, so plan picks up the
    // three example tables.
    aquaform()
        .current_dir(dir.path())
        .args(["plan"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 to add"));
}

#[test]
fn test_init_twice_reports_existing_state() {
    let dir = TempDir::new().unwrap();

    aquaform()
        .current_dir(dir.path())
        .args(["init"])
        .assert()
        .success();

    aquaform()
        .current_dir(dir.path())
        .args(["init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("State already exists"));
}

#[test]
fn test_plan_without_config_reports_no_changes() {
    let dir = TempDir::new().unwrap();

    aquaform()
        .current_dir(dir.path())
        .args(["plan"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No changes"));
}

#[test]
fn test_explicit_config_and_state_paths() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("tables.yaml");
    std::fs::write(
        &config,
        r#"
resources:
  users_table:
    type: supabase_table
    name: users
    url: https://example.supabase.co
    key: secret
    columns:
      - name: id
        type: UUID
        nullable: false
    primary_key: id
"#,
    )
    .unwrap();

    aquaform()
        .current_dir(dir.path())
        .args([
            "-c",
            "tables.yaml",
            "-s",
            "custom.state.json",
            "plan",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 to add"));
}
