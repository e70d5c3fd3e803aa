//! Test: Webhook - the receiver acknowledges at once and runs in the background

use crate::helpers::*;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use psychodrama::core::{BranchFilter, RunStatus};
use psychodrama::persistence::OutcomeStore;
use psychodrama::server;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tower::ServiceExt;

const DESCRIPTOR: &str = "endpoint: 127.0.0.1:9\nrun: [\"send_command:a\", \"send_command:b\"]\n";

async fn post(app: Router, body: String) -> (StatusCode, String) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(server::PAYLOAD_PATH)
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

fn payload(branch: &str) -> String {
    serde_json::to_string(&push_event(branch)).unwrap()
}

/// Test that the response comes back before the run it triggered finishes
#[tokio::test]
async fn test_payload_is_acknowledged_before_run_finishes() {
    let bed = TestBed::new(Some(DESCRIPTOR), |_| {
        RecordingActions::new().with_delay(Duration::from_millis(200))
    });

    let (status, body) = post(server::router(bed.runner.clone()), payload("develop")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
    assert!(bed.store.list(10).await.unwrap().is_empty());

    let outcomes = bed.wait_for_outcomes(1).await;
    assert_eq!(outcomes[0].status, RunStatus::Success);
    assert_eq!(bed.handler().steps(), vec!["send_command:a", "send_command:b"]);
}

/// Test that filtered-out branches are acknowledged but never run
#[tokio::test]
async fn test_filtered_branch_is_acknowledged_without_running() {
    let filter = BranchFilter::new(&["release-*"][..]).unwrap();
    let bed = TestBed::filtered(Some(DESCRIPTOR), filter, |_| RecordingActions::new());

    let (status, body) = post(server::router(bed.runner.clone()), payload("develop")).await;
    assert_eq!((status, body.as_str()), (StatusCode::OK, "OK"));

    post(server::router(bed.runner.clone()), payload("release-2.0")).await;
    let outcomes = bed.wait_for_outcomes(1).await;

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(bed.store.list(10).await.unwrap().len(), 1);
    assert_eq!(outcomes[0].id, 1);
    assert_eq!(bed.handler().steps().len(), 2);
}

/// Test that a body that is not a push event still gets OK
#[tokio::test]
async fn test_malformed_payload_is_acknowledged() {
    let bed = TestBed::new(Some(DESCRIPTOR), |_| RecordingActions::new());

    let (status, body) = post(server::router(bed.runner.clone()), "{\"zen\": true}".to_string()).await;

    assert_eq!((status, body.as_str()), (StatusCode::OK, "OK"));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(bed.store.list(10).await.unwrap().is_empty());
    assert!(bed.handler().steps().is_empty());
}

/// Test that deliveries for one branch share a runner and never overlap
#[tokio::test]
async fn test_same_branch_deliveries_are_serialized() {
    let bed = TestBed::new(Some(DESCRIPTOR), |_| {
        RecordingActions::new().with_delay(Duration::from_millis(30))
    });
    let app = server::router(bed.runner.clone());

    post(app.clone(), payload("develop")).await;
    post(app, payload("develop")).await;

    let outcomes = bed.wait_for_outcomes(2).await;
    assert!(outcomes.iter().all(|o| o.status == RunStatus::Success));
    assert_eq!(bed.handler().max_active.load(Ordering::SeqCst), 1);
    assert_eq!(bed.handler().steps().len(), 4);
}
