//! Clean rewrites the log; migrate splices another store's log in.

mod common;

use common::cli::{create_issue, run_ok, run_tissue, TissueWorkspace};

#[test]
fn clean_dry_run_changes_nothing() {
    let ws = TissueWorkspace::new();
    run_ok(&ws, ["init"]);
    create_issue(&ws, "stays open");
    let done = create_issue(&ws, "already done");
    run_ok(&ws, ["status", &done, "closed"]);

    let log_before = std::fs::read_to_string(ws.log_path()).unwrap();

    let run = run_tissue(&ws, ["--json", "clean"]);
    assert!(run.success());
    let report = run.json();
    assert_eq!(report["dry_run"], true);
    assert_eq!(report["removed"].as_array().unwrap().len(), 1);
    assert_eq!(report["removed"][0]["id"], done.as_str());

    assert_eq!(std::fs::read_to_string(ws.log_path()).unwrap(), log_before);
    let run = run_tissue(&ws, ["--json", "list"]);
    assert_eq!(run.json().as_array().unwrap().len(), 2);
}

#[test]
fn clean_force_removes_all_references() {
    let ws = TissueWorkspace::new();
    run_ok(&ws, ["init"]);
    let keep = create_issue(&ws, "keeper");
    let gone = create_issue(&ws, "doomed");

    run_ok(&ws, ["comment", &gone, "a comment on the doomed one"]);
    run_ok(&ws, ["dep", "add", &keep, "blocks", &gone]);
    run_ok(&ws, ["status", &gone, "closed"]);

    run_ok(&ws, ["clean", "--force"]);

    // Neither the log nor the cache mention the removed id.
    let log = std::fs::read_to_string(ws.log_path()).unwrap();
    assert!(!log.contains(&gone), "log still references {gone}: {log}");

    let run = run_tissue(&ws, ["--json", "list"]);
    let issues = run.json();
    assert_eq!(issues.as_array().unwrap().len(), 1);
    assert_eq!(issues.as_array().unwrap()[0]["id"], keep.as_str());

    let run = run_tissue(&ws, ["--json", "deps", &keep]);
    assert_eq!(run.json().as_array().unwrap().len(), 0);

    let run = run_tissue(&ws, ["show", &gone]);
    assert!(!run.success());
}

#[test]
fn clean_older_than_spares_recent_terminals() {
    let ws = TissueWorkspace::new();
    run_ok(&ws, ["init"]);
    let fresh = create_issue(&ws, "freshly closed");
    run_ok(&ws, ["status", &fresh, "closed"]);

    // Closed seconds ago: a 7-day window keeps it.
    let run = run_tissue(&ws, ["--json", "clean", "--older-than", "7"]);
    assert!(run.success());
    assert_eq!(run.json()["removed"].as_array().unwrap().len(), 0);

    // No window: eligible.
    let run = run_tissue(&ws, ["--json", "clean"]);
    assert_eq!(run.json()["removed"].as_array().unwrap().len(), 1);
}

#[test]
fn migrate_splices_and_dedups() {
    let src_ws = TissueWorkspace::new();
    run_ok(&src_ws, ["init", "--prefix", "src"]);
    let a = create_issue(&src_ws, "migrated a");
    let b = create_issue(&src_ws, "migrated b");
    run_ok(&src_ws, ["dep", "add", &a, "blocks", &b]);
    run_ok(&src_ws, ["comment", &a, "carried over"]);

    let dst_ws = TissueWorkspace::new();
    run_ok(&dst_ws, ["init", "--prefix", "dst"]);
    create_issue(&dst_ws, "native issue");

    let src_store = src_ws.store_dir();

    // Dry run reports counts, changes nothing.
    let run = run_tissue(
        &dst_ws,
        ["--json", "migrate", src_store.to_str().unwrap()],
    );
    assert!(run.success(), "stderr: {}", run.stderr);
    let report = run.json();
    assert_eq!(report["dry_run"], true);
    assert_eq!(report["issues"], 2);
    assert_eq!(report["deps"], 1);
    assert_eq!(report["comments"], 1);
    let run = run_tissue(&dst_ws, ["--json", "list"]);
    assert_eq!(run.json().as_array().unwrap().len(), 1);

    // Forced: everything lands.
    run_ok(
        &dst_ws,
        ["migrate", src_store.to_str().unwrap(), "--force"],
    );
    let run = run_tissue(&dst_ws, ["--json", "list"]);
    assert_eq!(run.json().as_array().unwrap().len(), 3);
    let run = run_tissue(&dst_ws, ["--json", "comments", &a]);
    assert_eq!(run.json().as_array().unwrap().len(), 1);
    let run = run_tissue(&dst_ws, ["--json", "deps", &a]);
    assert_eq!(run.json().as_array().unwrap().len(), 1);

    // Re-running migrates nothing: ids are already present.
    let run = run_tissue(
        &dst_ws,
        ["--json", "migrate", src_store.to_str().unwrap(), "--force"],
    );
    assert!(run.success());
    let report = run.json();
    assert_eq!(report["issues"], 0);
    assert_eq!(report["deps"], 0);
    assert_eq!(report["comments"], 0);
}

#[test]
fn migrate_missing_source_fails() {
    let ws = TissueWorkspace::new();
    run_ok(&ws, ["init"]);
    let run = run_tissue(&ws, ["migrate", "/nonexistent/store"]);
    assert!(!run.success());
    assert!(run.stderr.contains("No issue store found"));
}
