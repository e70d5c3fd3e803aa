//! Test: Reporting - every run appends exactly one outcome

use crate::helpers::*;
use psychodrama::core::RunStatus;
use psychodrama::persistence::OutcomeStore;

/// Test that sequential runs get ids 1..N
#[tokio::test]
async fn test_sequential_ids() {
    let bed = TestBed::new(
        Some("endpoint: 127.0.0.1:9\nrun: [\"send_command:go\"]\n"),
        |_| RecordingActions::new(),
    );

    for _ in 0..4 {
        bed.runner.run(&push_event("develop")).await;
    }

    let mut ids: Vec<_> = bed.store.list(10).await.unwrap().iter().map(|o| o.id).collect();
    ids.sort();
    assert_eq!(ids, vec![1, 2, 3, 4]);
}

/// Test that a working copy without a descriptor is skipped, not failed
#[tokio::test]
async fn test_no_config_is_skipped() {
    let bed = TestBed::new(None, |_| RecordingActions::new());

    let result = bed.runner.run(&push_event("develop")).await;

    assert_eq!(result.status, RunStatus::Skipped);
    assert_eq!(result.message, "no config present");
    assert!(bed.handler().steps().is_empty());

    let outcome = result.outcome.unwrap();
    assert_eq!(outcome.id, 1);
    assert_eq!(outcome.message, "no config present");
    assert!(outcome.duration >= 0.0);
}

/// Test that a descriptor without an endpoint fails before any phase
#[tokio::test]
async fn test_missing_endpoint_is_configuration_error() {
    let bed = TestBed::new(Some("run: [\"send_command:go\"]\n"), |_| RecordingActions::new());

    let result = bed.runner.run(&push_event("develop")).await;

    assert_eq!(result.status, RunStatus::Failed);
    assert_eq!(
        result.message,
        "configuration error: descriptor is missing required field 'endpoint'"
    );
    assert!(bed.handler().steps().is_empty());

    let stored = bed.store.list(1).await.unwrap();
    assert_eq!(stored[0].status, RunStatus::Failed);
    assert_eq!(stored[0].message, result.message);
}

/// Test that a tag push is reported as a failure rather than run
#[tokio::test]
async fn test_tag_push_is_not_a_branch() {
    let bed = TestBed::new(
        Some("endpoint: 127.0.0.1:9\nrun: [\"send_command:go\"]\n"),
        |_| RecordingActions::new(),
    );
    let mut event = push_event("develop");
    event.git_ref = "refs/tags/v1.0".to_string();

    let result = bed.runner.run(&event).await;

    assert_eq!(result.status, RunStatus::Failed);
    assert!(result.message.contains("refs/tags/v1.0"));
    assert!(bed.handler().steps().is_empty());
}
