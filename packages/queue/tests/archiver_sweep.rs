// ABOUTME: Integration tests for the archiver and dead-letter manager
// ABOUTME: Covers sweep eligibility, idempotency, and unknown-status preservation

use chrono::Utc;
use corral_queue::{
    ArchiveStats, Archiver, CreateTaskOptions, FinalStatus, QueueLayout, TaskResult, TaskStore,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::path::Path;

fn setup() -> (TaskStore, Archiver, tempfile::TempDir) {
    let root = tempfile::tempdir().expect("Failed to create temp root");
    let store = TaskStore::new(QueueLayout::under(root.path()));
    let archiver = Archiver::new(store.clone());
    (store, archiver, root)
}

fn finish_task(store: &TaskStore, worker: &str, task_id: &str, status: &str) {
    store
        .write_result(
            worker,
            &TaskResult {
                task_id: task_id.to_string(),
                status: status.to_string(),
                stdout: String::new(),
                stderr: String::new(),
                exit_code: Some(if status == "success" { 0 } else { 1 }),
                execution_time: Some(1.0),
                timestamp: Utc::now(),
            },
        )
        .expect("Failed to write result");
}

fn archive_listing(dir: &Path) -> Vec<String> {
    let mut names = Vec::new();
    if dir.is_dir() {
        for entry in walk(dir) {
            names.push(entry);
        }
    }
    names.sort();
    names
}

fn walk(dir: &Path) -> Vec<String> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir).unwrap() {
        let entry = entry.unwrap();
        let path = entry.path();
        if path.is_dir() {
            out.extend(walk(&path));
        } else {
            out.push(path.to_string_lossy().into_owned());
        }
    }
    out
}

#[test]
fn sweep_archives_finished_tasks_by_outcome() {
    let (store, archiver, _root) = setup();

    let ok = store
        .create_task("w1", json!({"n": 1}), CreateTaskOptions::default())
        .unwrap();
    let bad = store
        .create_task("w1", json!({"n": 2}), CreateTaskOptions::default())
        .unwrap();
    finish_task(&store, "w1", &ok, "completed");
    finish_task(&store, "w1", &bad, "error");

    let stats = archiver.archive_all(Some("w1")).unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.success, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.by_worker.get("w1"), Some(&2));

    // Source queue is empty, archive co-locates task and result
    assert!(store.list_tasks("w1").unwrap().is_empty());
    let archive = store.layout().archive.join("w1");
    assert!(archive.join("success").join(format!("{}.json", ok)).is_file());
    assert!(archive
        .join("success")
        .join(format!("{}-result.json", ok))
        .is_file());
    assert!(archive.join("failed").join(format!("{}.json", bad)).is_file());
    assert!(archive
        .join("failed")
        .join(format!("{}-result.json", bad))
        .is_file());
}

#[test]
fn archived_copy_is_stamped() {
    let (store, archiver, _root) = setup();

    let task_id = store
        .create_task("w1", json!({}), CreateTaskOptions::default())
        .unwrap();
    finish_task(&store, "w1", &task_id, "success");
    archiver.archive_all(Some("w1")).unwrap();

    let path = store
        .layout()
        .archive
        .join("w1")
        .join("success")
        .join(format!("{}.json", task_id));
    let archived: corral_queue::Task =
        serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
    assert!(archived.archived_at.is_some());
    assert_eq!(archived.archive_status, Some(FinalStatus::Success));
}

#[test]
fn sweep_is_idempotent() {
    let (store, archiver, root) = setup();

    let task_id = store
        .create_task("w1", json!({}), CreateTaskOptions::default())
        .unwrap();
    finish_task(&store, "w1", &task_id, "success");

    let first = archiver.archive_all(None).unwrap();
    assert_eq!(first.total, 1);

    let before = archive_listing(&root.path().join("archive"));
    let second = archiver.archive_all(None).unwrap();
    let after = archive_listing(&root.path().join("archive"));

    assert_eq!(second, ArchiveStats::default());
    assert_eq!(before, after);
}

#[test]
fn task_without_result_is_not_swept() {
    let (store, archiver, _root) = setup();

    let task_id = store
        .create_task("w1", json!({}), CreateTaskOptions::default())
        .unwrap();

    let stats = archiver.archive_all(Some("w1")).unwrap();
    assert_eq!(stats.total, 0);
    assert!(store.load_task("w1", &task_id).is_ok());
}

#[test]
fn unknown_status_is_preserved_in_the_queue() {
    let (store, archiver, _root) = setup();

    let task_id = store
        .create_task("w1", json!({}), CreateTaskOptions::default())
        .unwrap();
    finish_task(&store, "w1", &task_id, "weird");

    let stats = archiver.archive_all(Some("w1")).unwrap();
    assert_eq!(stats.total, 0);
    assert!(store.load_task("w1", &task_id).is_ok());
    assert!(store.read_result("w1", &task_id).unwrap().is_some());
}

#[test]
fn explicit_archive_dead_letters_without_result() {
    let (store, archiver, _root) = setup();

    let task_id = store
        .create_task("w1", json!({}), CreateTaskOptions::default())
        .unwrap();

    let archived = archiver
        .archive_task("w1", &task_id, FinalStatus::Failed)
        .unwrap();
    assert!(archived);

    assert!(store.list_tasks("w1").unwrap().is_empty());
    assert!(store
        .layout()
        .archive
        .join("w1")
        .join("failed")
        .join(format!("{}.json", task_id))
        .is_file());
}

#[test]
fn explicit_archive_prefers_result_status_over_default() {
    let (store, archiver, _root) = setup();

    let task_id = store
        .create_task("w1", json!({}), CreateTaskOptions::default())
        .unwrap();
    finish_task(&store, "w1", &task_id, "success");

    archiver
        .archive_task("w1", &task_id, FinalStatus::Failed)
        .unwrap();

    assert!(store
        .layout()
        .archive
        .join("w1")
        .join("success")
        .join(format!("{}.json", task_id))
        .is_file());
}

#[test]
fn explicit_archive_of_missing_task_errors() {
    let (_store, archiver, _root) = setup();
    assert!(archiver
        .archive_task("w1", "w1-nope", FinalStatus::Failed)
        .is_err());
}

#[test]
fn archival_consumes_stale_triggers() {
    let (store, archiver, _root) = setup();

    let task_id = store
        .create_task("w1", json!({}), CreateTaskOptions::default())
        .unwrap();
    finish_task(&store, "w1", &task_id, "success");
    assert!(store.trigger_exists("w1", &task_id));

    archiver.archive_all(Some("w1")).unwrap();
    assert!(!store.trigger_exists("w1", &task_id));
}

#[test]
fn purge_results_removes_live_copy_after_archive() {
    let (store, _archiver, _root) = setup();
    let archiver = Archiver::new(store.clone()).purge_results(true);

    let task_id = store
        .create_task("w1", json!({}), CreateTaskOptions::default())
        .unwrap();
    finish_task(&store, "w1", &task_id, "success");

    archiver.archive_all(Some("w1")).unwrap();
    assert!(store.read_result("w1", &task_id).unwrap().is_none());
    assert!(store
        .layout()
        .archive
        .join("w1")
        .join("success")
        .join(format!("{}-result.json", task_id))
        .is_file());
}

#[test]
fn crash_between_copy_and_delete_self_heals() {
    let (store, archiver, _root) = setup();

    let task_id = store
        .create_task("w1", json!({}), CreateTaskOptions::default())
        .unwrap();
    finish_task(&store, "w1", &task_id, "success");

    // Simulate a crash after the archive copies were written but before the
    // source delete: pre-write the copies, leave the task in place.
    let archive_dir = store.layout().archive.join("w1").join("success");
    std::fs::create_dir_all(&archive_dir).unwrap();
    std::fs::copy(
        store.task_path("w1", &task_id),
        archive_dir.join(format!("{}.json", task_id)),
    )
    .unwrap();

    let stats = archiver.archive_all(Some("w1")).unwrap();
    assert_eq!(stats.total, 1);
    assert!(store.list_tasks("w1").unwrap().is_empty());
}
