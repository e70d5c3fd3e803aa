//! Test: Teardown - every process a run starts is terminated on every exit path

use crate::helpers::*;
use psychodrama::core::RunStatus;

/// Test that processes started before a run-phase failure are gone when the run returns
#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_processes_terminated_after_run_failure() {
    let descriptor = r#"
endpoint: 127.0.0.1:9
pre_run:
  - start_simulator:sleep 30
  - start_app:sleep 30
run:
  - send_command:fail_acquisition
"#;
    let bed = TestBed::new(Some(descriptor), |_| RecordingActions::new());

    let result = bed.runner.run(&push_event("develop")).await;

    assert_eq!(result.status, RunStatus::Failed);
    assert!(result.message.starts_with("Run failed at step"));

    let pids = bed.handler().pids();
    assert_eq!(pids.len(), 2);
    for pid in pids {
        assert!(!process_exists(pid), "process {} survived the run", pid);
    }
}

/// Test that a successful run also tears its processes down
#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_processes_terminated_after_success() {
    let descriptor = r#"
endpoint: 127.0.0.1:9
pre_run: ["start_simulator:sleep 30"]
run: ["send_command:go"]
"#;
    let bed = TestBed::new(Some(descriptor), |_| RecordingActions::new());

    let result = bed.runner.run(&push_event("develop")).await;

    assert_eq!(result.status, RunStatus::Success);
    let pids = bed.handler().pids();
    assert_eq!(pids.len(), 1);
    assert!(!process_exists(pids[0]));
}
