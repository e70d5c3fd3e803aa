//! Test: Controller - production actions against a fake experiment controller

use crate::helpers::*;
use psychodrama::core::RunStatus;
use psychodrama::execution::ControllerActions;
use serde_json::json;

fn descriptor(endpoint: &str, run: &str) -> String {
    format!("endpoint: \"{}\"\nrun:\n  - \"{}\"\n", endpoint, run)
}

/// Test that send_command delivers its envelope and accepts an OK reply
#[tokio::test]
async fn test_send_command_round_trip() {
    let controller = FakeController::start("OK").await;
    let descriptor = descriptor(
        &controller.endpoint.to_string(),
        "send_command:start_experiment duration=30 sample=blank",
    );
    let bed = TestBed::new(Some(&descriptor), |_| ControllerActions::new());

    let result = bed.runner.run(&push_event("develop")).await;

    assert_eq!(result.status, RunStatus::Success);
    let received = controller.received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].command, "start_experiment");
    assert_eq!(received[0].payload["duration"], json!(30));
    assert_eq!(received[0].payload["sample"], json!("blank"));
}

/// Test that any reply other than OK fails the phase
#[tokio::test]
async fn test_unexpected_reply_fails_run() {
    let controller = FakeController::start("ERROR interlock open").await;
    let descriptor = descriptor(&controller.endpoint.to_string(), "send_command:start_experiment");
    let bed = TestBed::new(Some(&descriptor), |_| ControllerActions::new());

    let result = bed.runner.run(&push_event("develop")).await;

    assert_eq!(result.status, RunStatus::Failed);
    assert!(result.message.starts_with("Run failed at step 'send_command:start_experiment'"));
    assert!(result.message.contains("ERROR interlock open"));
    assert_eq!(controller.commands(), vec!["start_experiment"]);
}

/// Test that an unreachable controller counts as no response
#[tokio::test]
async fn test_unreachable_controller_fails_run() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let descriptor = descriptor(&addr.to_string(), "send_command:start_experiment");
    let bed = TestBed::new(Some(&descriptor), |_| ControllerActions::new());

    let result = bed.runner.run(&push_event("develop")).await;

    assert_eq!(result.status, RunStatus::Failed);
    assert!(result.message.contains("no response to 'start_experiment'"));
}
