//! Test: Phase Ordering - steps run in listed order and the first failure aborts

use crate::helpers::*;
use psychodrama::core::RunStatus;

/// Test that every phase runs, in order, when nothing fails
#[tokio::test]
async fn test_phases_run_in_listed_order() {
    let descriptor = r#"
endpoint: 127.0.0.1:9
pre_run:
  - send_command:a
run:
  - send_command:b1
  - send_command:b2
post_run:
  - report_results
"#;
    let bed = TestBed::new(Some(descriptor), |_| RecordingActions::new());

    let result = bed.runner.run(&push_event("develop")).await;

    assert_eq!(result.status, RunStatus::Success);
    assert_eq!(result.message, "run completed");
    assert_eq!(
        bed.handler().steps(),
        vec![
            "send_command:a",
            "send_command:b1",
            "send_command:b2",
            "report_results"
        ]
    );
}

/// Test that a failing pre-run step stops its phase and every later phase
#[tokio::test]
async fn test_failure_aborts_remaining_steps_and_phases() {
    let descriptor = r#"
endpoint: 127.0.0.1:9
pre_run: ["send_command:a", "send_command:fails_b", "send_command:c"]
run: ["send_command:d"]
post_run: ["send_command:e"]
"#;
    let bed = TestBed::new(Some(descriptor), |_| RecordingActions::new());

    let result = bed.runner.run(&push_event("develop")).await;

    assert_eq!(result.status, RunStatus::Failed);
    assert_eq!(
        result.message,
        "PreRun failed at step 'send_command:fails_b': fails_b raised"
    );
    assert_eq!(bed.handler().steps(), vec!["send_command:a", "send_command:fails_b"]);
}

/// Test that a post-run failure is reported against the post-run phase
#[tokio::test]
async fn test_post_run_failure_names_its_phase() {
    let descriptor = r#"
endpoint: 127.0.0.1:9
run: ["send_command:go"]
post_run: ["send_command:fail_cleanup"]
"#;
    let bed = TestBed::new(Some(descriptor), |_| RecordingActions::new());

    let result = bed.runner.run(&push_event("develop")).await;

    assert_eq!(result.status, RunStatus::Failed);
    assert!(result.message.starts_with("PostRun failed at step 'send_command:fail_cleanup'"));
    assert_eq!(bed.handler().steps(), vec!["send_command:go", "send_command:fail_cleanup"]);
}

/// Test that an unknown step name fails the run before any phase executes
#[tokio::test]
async fn test_unknown_step_fails_at_load() {
    let descriptor = r#"
endpoint: 127.0.0.1:9
pre_run: ["send_command:a"]
run: ["launch_rockets"]
"#;
    let bed = TestBed::new(Some(descriptor), |_| RecordingActions::new());

    let result = bed.runner.run(&push_event("develop")).await;

    assert_eq!(result.status, RunStatus::Failed);
    assert!(result.message.starts_with("configuration error:"));
    assert!(result.message.contains("launch_rockets"));
    assert!(bed.handler().steps().is_empty());
}
