//! Test: Support Cleanup - support files are staged before phases and the
//! declared root is removed afterwards

use crate::helpers::*;
use psychodrama::core::RunStatus;

const DESCRIPTOR: &str = r#"
endpoint: 127.0.0.1:9
support:
  - root: support
  - path: support/logs
  - path: support/setupfiles/devices.yaml
    text: "valve: 8000\n"
  - path: notes/readme.txt
    text: kept
pre_run: ["send_command:a"]
run: ["send_command:RUN_ARG"]
"#;

/// Test that the support root exists during phases and is gone after success
#[tokio::test]
async fn test_support_root_removed_after_success() {
    let descriptor = DESCRIPTOR.replace("RUN_ARG", "b");
    let bed = TestBed::new(Some(&descriptor), |dir| {
        RecordingActions::new().watching(dir.join("support/setupfiles/devices.yaml"))
    });

    let result = bed.runner.run(&push_event("develop")).await;

    assert_eq!(result.status, RunStatus::Success);
    assert_eq!(*bed.handler().watched_seen.lock().unwrap(), vec![true, true]);
    assert!(!bed.path().join("support").exists());
    assert_eq!(
        std::fs::read_to_string(bed.path().join("notes/readme.txt")).unwrap(),
        "kept"
    );
}

/// Test that the support root is removed when a phase fails
#[tokio::test]
async fn test_support_root_removed_after_failure() {
    let descriptor = DESCRIPTOR.replace("RUN_ARG", "fail_b");
    let bed = TestBed::new(Some(&descriptor), |dir| {
        RecordingActions::new().watching(dir.join("support/logs"))
    });

    let result = bed.runner.run(&push_event("develop")).await;

    assert_eq!(result.status, RunStatus::Failed);
    assert_eq!(*bed.handler().watched_seen.lock().unwrap(), vec![true, true]);
    assert!(!bed.path().join("support").exists());
}

/// Test that the database is recreated from its statements before phases run
#[tokio::test]
async fn test_database_initialized_before_phases() {
    let descriptor = r#"
endpoint: 127.0.0.1:9
database:
  path: data/experiment.sqlite3
  sql:
    - "CREATE TABLE runs (id INTEGER); INSERT INTO runs VALUES (1)"
run: ["send_command:go"]
"#;
    let bed = TestBed::new(Some(descriptor), |dir| {
        RecordingActions::new().watching(dir.join("data/experiment.sqlite3"))
    });

    let first = bed.runner.run(&push_event("develop")).await;
    let second = bed.runner.run(&push_event("develop")).await;

    assert_eq!(first.status, RunStatus::Success);
    // A second run starts from a fresh file, so CREATE TABLE does not collide
    assert_eq!(second.status, RunStatus::Success);
    assert_eq!(*bed.handler().watched_seen.lock().unwrap(), vec![true, true]);
}

/// Test that bad SQL fails the run before any phase executes
#[tokio::test]
async fn test_database_failure_aborts_run() {
    let descriptor = r#"
endpoint: 127.0.0.1:9
database:
  path: experiment.sqlite3
  sql: ["CREATE TABLE; nonsense"]
run: ["send_command:go"]
"#;
    let bed = TestBed::new(Some(descriptor), |_| RecordingActions::new());

    let result = bed.runner.run(&push_event("develop")).await;

    assert_eq!(result.status, RunStatus::Failed);
    assert!(result.message.starts_with("database initialization failed:"));
    assert!(bed.handler().steps().is_empty());
}
