#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn triggerd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("triggerd").unwrap();
    cmd.current_dir(dir.path())
        .env("TRIGGERD_ROOT", dir.path())
        .env_remove("RUST_LOG");
    cmd
}

fn init(dir: &TempDir) {
    triggerd(dir).arg("init").assert().success();
}

fn stored_ids(dir: &TempDir) -> Vec<String> {
    let out = triggerd(dir)
        .args(["--json", "triggers", "list"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let records: Vec<serde_json::Value> = serde_json::from_slice(&out.stdout).unwrap();
    records
        .iter()
        .map(|r| r["id"].as_str().unwrap().to_string())
        .collect()
}

const HOT: &str = r#"{
    "id": "too-hot",
    "sensor_id": "temperature",
    "condition": {"type": "greater_than", "threshold": 27},
    "action": {"type": "publish_alert", "alert": "Hot {value}"}
}"#;

// ---------------------------------------------------------------------------
// triggerd init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_config_and_store() {
    let dir = TempDir::new().unwrap();
    triggerd(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"));

    assert!(dir.path().join(".triggerd").is_dir());
    assert!(dir.path().join(".triggerd/config.yaml").exists());
    assert!(dir.path().join(".triggerd/triggerd.db").exists());
}

#[test]
fn init_is_idempotent() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    triggerd(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn commands_need_init() {
    let dir = TempDir::new().unwrap();
    triggerd(&dir)
        .args(["triggers", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("triggerd init"));
}

// ---------------------------------------------------------------------------
// triggerd config
// ---------------------------------------------------------------------------

#[test]
fn default_config_validates() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    triggerd(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config OK"));
}

#[test]
fn invalid_config_fails_validation() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    std::fs::write(
        dir.path().join(".triggerd/config.yaml"),
        "dispatch:\n  workers: 0\nactuators:\n  fan:\n    base_url: 10.0.0.5\n",
    )
    .unwrap();
    triggerd(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("[error] dispatch.workers"))
        .stderr(predicate::str::contains("config validation found errors"));
}

#[test]
fn config_show_prints_thresholds() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    triggerd(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("temp_high: 27"));
}

// ---------------------------------------------------------------------------
// triggerd triggers
// ---------------------------------------------------------------------------

#[test]
fn seed_stores_default_catalog() {
    let dir = TempDir::new().unwrap();
    triggerd(&dir).args(["init", "--seed"]).assert().success();
    let ids = stored_ids(&dir);
    assert_eq!(ids[0], "temperature_too_hot");
    assert!(ids.contains(&"temperature_display".to_string()));

    // Seeding again overwrites rather than duplicating.
    let before = ids.len();
    triggerd(&dir).args(["triggers", "seed"]).assert().success();
    assert_eq!(stored_ids(&dir).len(), before);
}

#[test]
fn add_list_remove_clear() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    let file = dir.path().join("hot.json");
    std::fs::write(&file, HOT).unwrap();

    triggerd(&dir)
        .args(["triggers", "add"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved trigger 'too-hot'"));

    triggerd(&dir)
        .args(["triggers", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("too-hot"))
        .stdout(predicate::str::contains("greater_than"));

    triggerd(&dir)
        .args(["triggers", "remove", "too-hot"])
        .assert()
        .success();
    triggerd(&dir)
        .args(["triggers", "remove", "too-hot"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("trigger not found"));

    triggerd(&dir).args(["triggers", "seed"]).assert().success();
    triggerd(&dir)
        .args(["--json", "triggers", "clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"removed\": 7"));
    assert!(stored_ids(&dir).is_empty());
}

#[test]
fn add_reads_stdin_and_rejects_unknown_strategies() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    triggerd(&dir)
        .args(["triggers", "add"])
        .write_stdin(HOT)
        .assert()
        .success();

    let bad = HOT.replace("publish_alert", "temperature_too_hot");
    triggerd(&dir)
        .args(["triggers", "add", "-"])
        .write_stdin(bad)
        .assert()
        .failure()
        .stderr(predicate::str::contains("rejected"));
    assert_eq!(stored_ids(&dir), vec!["too-hot"]);
}

// ---------------------------------------------------------------------------
// triggerd replay / faults
// ---------------------------------------------------------------------------

#[test]
fn replay_prints_effects_without_side_effects() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    triggerd(&dir)
        .args(["triggers", "add"])
        .write_stdin(HOT)
        .assert()
        .success();

    let readings = dir.path().join("readings.jsonl");
    std::fs::write(
        &readings,
        "{\"sensor_id\":\"temperature\",\"value\":21}\ngarbage\n{\"sensor_id\":\"temperature\",\"value\":\"28\"}\n",
    )
    .unwrap();

    triggerd(&dir)
        .arg("replay")
        .arg(&readings)
        .assert()
        .success()
        .stdout(predicate::str::contains("sensors/temperature/alerts"))
        .stdout(predicate::str::contains("Hot 28"))
        .stderr(predicate::str::contains("line 2"));

    let out = triggerd(&dir)
        .args(["--json", "replay"])
        .arg(&readings)
        .output()
        .unwrap();
    assert!(out.status.success());
    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["readings"].as_array().unwrap().len(), 2);
    assert_eq!(json["readings"][1]["fired"][0], "too-hot");
    assert_eq!(json["rejected"][0]["line"], 2);
}

#[test]
fn replay_with_defaults_reports_faults() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    let readings = dir.path().join("readings.jsonl");
    std::fs::write(
        &readings,
        "{\"sensor_id\":\"sound\",\"value\":5}\n{\"sensor_id\":\"temperature\",\"value\":31}\n",
    )
    .unwrap();
    triggerd(&dir)
        .args(["replay", "--defaults"])
        .arg(&readings)
        .assert()
        .success()
        .stdout(predicate::str::contains("fault heating_error"));

    // Replay never writes to the store.
    triggerd(&dir)
        .args(["faults", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No faults recorded."));
}
