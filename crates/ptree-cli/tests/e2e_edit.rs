//! E2E tests for the mutating commands: create, update, delete, move.
//!
//! Every command writes back to the input file unless `--output` is given,
//! so each test checks the file on disk with a follow-up `pt show`.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test Harness
// ---------------------------------------------------------------------------

const FIXTURE: &str = include_str!("fixtures/roadmap.xml");

fn pt_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("pt"));
    cmd.current_dir(dir);
    cmd.env("PTREE_LOG", "error");
    cmd.env("XDG_CONFIG_HOME", dir.join(".config"));
    cmd.env("HOME", dir);
    cmd.env_remove("FORMAT");
    cmd
}

fn setup() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    std::fs::write(dir.path().join("roadmap.xml"), FIXTURE).expect("write fixture");
    dir
}

fn run_json(dir: &Path, args: &[&str]) -> Value {
    let output = pt_cmd(dir)
        .args(args)
        .arg("--json")
        .output()
        .expect("pt should not crash");
    assert!(
        output.status.success(),
        "{args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid JSON")
}

fn show(dir: &Path, file: &str, id: &str) -> Value {
    run_json(dir, &["show", file, id])
}

fn node_count(dir: &Path, file: &str) -> u64 {
    run_json(dir, &["import", file])["nodes"]
        .as_u64()
        .expect("nodes")
}

// ---------------------------------------------------------------------------
// create
// ---------------------------------------------------------------------------

#[test]
fn create_child_gets_fresh_id_and_is_saved() {
    let dir = setup();
    let created = run_json(
        dir.path(),
        &[
            "create",
            "roadmap.xml",
            "--parent",
            "g2",
            "--type",
            "work_item",
            "--title",
            "Retry payments",
            "--status",
            "todo",
            "--team",
            "Payments",
        ],
    );
    assert_eq!(created["id"], "g2.work_item_1");
    assert_eq!(created["parent_id"], "g2");

    let node = show(dir.path(), "roadmap.xml", "g2.work_item_1");
    assert_eq!(node["title"], "Retry payments");
    assert_eq!(node["team"], "Payments");
    assert_eq!(node["parent_id"], "g2");
    assert_eq!(node_count(dir.path(), "roadmap.xml"), 8);
}

#[test]
fn create_job_keeps_schedule() {
    let dir = setup();
    let created = run_json(
        dir.path(),
        &[
            "create", "roadmap.xml", "--parent", "g2", "--type", "job", "--title", "Alerting",
            "--effort", "2w", "--start", "2025-02-01", "--end", "2025-02-14",
        ],
    );
    let id = created["id"].as_str().expect("id");
    let node = show(dir.path(), "roadmap.xml", id);
    assert_eq!(node["job_data"]["effort_estimate"], "2w");
    assert_eq!(node["job_data"]["end_date"], "2025-02-14");
}

#[test]
fn create_top_level_node() {
    let dir = setup();
    let created = run_json(
        dir.path(),
        &[
            "create", "roadmap.xml", "--parent", "none", "--type", "product", "--title", "Billing",
        ],
    );
    assert_eq!(created["id"], "product_1");
    assert_eq!(created["parent_id"], Value::Null);

    let rows = run_json(dir.path(), &["tree", "roadmap.xml"]);
    assert_eq!(rows.as_array().expect("rows").len(), 2);
}

#[test]
fn create_under_unknown_parent_fails_and_leaves_file() {
    let dir = setup();
    pt_cmd(dir.path())
        .args([
            "create", "roadmap.xml", "--parent", "nope", "--type", "goal", "--title", "X",
            "--format", "json",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2002"));
    let text = std::fs::read_to_string(dir.path().join("roadmap.xml")).expect("read");
    assert_eq!(text, FIXTURE);
}

#[test]
fn create_with_unwritable_type_fails_and_tree_still_loads() {
    let dir = setup();
    for bad in ["title", "user story"] {
        pt_cmd(dir.path())
            .args([
                "create", "roadmap.xml", "--parent", "p1", "--type", bad, "--title", "X",
                "--format", "json",
            ])
            .assert()
            .failure()
            .stderr(predicate::str::contains("E2005"));
    }
    let text = std::fs::read_to_string(dir.path().join("roadmap.xml")).expect("read");
    assert_eq!(text, FIXTURE);
    assert_eq!(node_count(dir.path(), "roadmap.xml"), 7);
}

#[test]
fn create_with_custom_type_survives_reload() {
    let dir = setup();
    let created = run_json(
        dir.path(),
        &[
            "create", "roadmap.xml", "--parent", "g2", "--type", "user_story", "--title",
            "  Padded  ",
        ],
    );
    let id = created["id"].as_str().expect("id").to_string();
    assert_eq!(node_count(dir.path(), "roadmap.xml"), 8);
    let node = show(dir.path(), "roadmap.xml", &id);
    assert_eq!(node["type"], "user_story");
    assert_eq!(node["title"], "Padded");
}

// ---------------------------------------------------------------------------
// update
// ---------------------------------------------------------------------------

#[test]
fn update_changes_fields_and_bumps_updated_at() {
    let dir = setup();
    let before = show(dir.path(), "roadmap.xml", "p1");
    run_json(
        dir.path(),
        &["update", "roadmap.xml", "p1", "--status", "done", "--owner", "bo"],
    );
    let after = show(dir.path(), "roadmap.xml", "p1");
    assert_eq!(after["status"], "done");
    assert_eq!(after["owner"], "bo");
    assert_eq!(after["title"], before["title"]);
    assert_ne!(after["updated_at"], before["updated_at"]);
}

#[test]
fn update_without_fields_is_rejected() {
    let dir = setup();
    pt_cmd(dir.path())
        .args(["update", "roadmap.xml", "p1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothing to update"));
}

#[test]
fn update_job_fields_on_non_job_is_rejected() {
    let dir = setup();
    pt_cmd(dir.path())
        .args(["update", "roadmap.xml", "w1", "--effort", "1d", "--format", "json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2005"));
}

#[test]
fn update_to_reserved_type_is_rejected() {
    let dir = setup();
    pt_cmd(dir.path())
        .args(["update", "roadmap.xml", "w1", "--type", "description", "--format", "json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2005"));
    assert_eq!(show(dir.path(), "roadmap.xml", "w1")["type"], "work_item");
}

#[test]
fn update_unknown_id_fails() {
    let dir = setup();
    pt_cmd(dir.path())
        .args(["update", "roadmap.xml", "zz", "--status", "done", "--format", "json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2001"));
}

#[test]
fn update_with_output_leaves_input_untouched() {
    let dir = setup();
    let result = run_json(
        dir.path(),
        &["update", "roadmap.xml", "w1", "--status", "done", "-o", "edited.json"],
    );
    assert!(result["saved_to"].as_str().expect("saved_to").ends_with("edited.json"));

    assert_eq!(show(dir.path(), "roadmap.xml", "w1")["status"], "todo");
    assert_eq!(show(dir.path(), "edited.json", "w1")["status"], "done");
    let snapshot = std::fs::read_to_string(dir.path().join("edited.json")).expect("read");
    assert!(snapshot.trim_start().starts_with('{'));
}

// ---------------------------------------------------------------------------
// delete
// ---------------------------------------------------------------------------

#[test]
fn delete_cascades_to_descendants() {
    let dir = setup();
    let result = run_json(dir.path(), &["delete", "roadmap.xml", "g1"]);
    let mut removed: Vec<&str> = result["removed"]
        .as_array()
        .expect("removed")
        .iter()
        .map(|v| v.as_str().expect("id"))
        .collect();
    removed.sort_unstable();
    assert_eq!(removed, ["g1", "j1", "w1", "w2"]);
    assert_eq!(result["remaining"], 3);

    pt_cmd(dir.path())
        .args(["show", "roadmap.xml", "w1"])
        .assert()
        .failure();
    let analysis = run_json(dir.path(), &["analyze", "roadmap.xml"]);
    assert_eq!(analysis["dangling_edges"], serde_json::json!([]));
}

#[test]
fn delete_unknown_id_fails() {
    let dir = setup();
    pt_cmd(dir.path())
        .args(["delete", "roadmap.xml", "zz"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

// ---------------------------------------------------------------------------
// move
// ---------------------------------------------------------------------------

#[test]
fn move_reparents_node() {
    let dir = setup();
    let result = run_json(dir.path(), &["move", "roadmap.xml", "w3", "--parent", "j1"]);
    assert_eq!(result["from"], "g2");
    assert_eq!(result["to"], "j1");
    assert_eq!(result["depth"], 3);

    let node = show(dir.path(), "roadmap.xml", "w3");
    assert_eq!(node["parent_id"], "j1");
    assert_eq!(show(dir.path(), "roadmap.xml", "g2")["child_count"], 0);
}

#[test]
fn move_to_top_level() {
    let dir = setup();
    run_json(dir.path(), &["move", "roadmap.xml", "g2", "--parent", "none"]);
    let node = show(dir.path(), "roadmap.xml", "g2");
    assert_eq!(node["parent_id"], Value::Null);
    assert_eq!(node["depth"], 0);
}

#[test]
fn move_under_own_descendant_is_rejected() {
    let dir = setup();
    pt_cmd(dir.path())
        .args(["move", "roadmap.xml", "g1", "--parent", "w1", "--format", "json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2004"));
    assert_eq!(show(dir.path(), "roadmap.xml", "g1")["parent_id"], "p1");
}
