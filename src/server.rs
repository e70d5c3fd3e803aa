//! Webhook receiver
//!
//! `POST /payload` takes a repository push event, hands it to the one shared
//! [`Runner`] and answers `OK` straight away, whatever the payload or the run
//! turns out to be. Outcomes only show up in the results store.

use crate::core::PushEvent;
use crate::execution::{ActionHandler, Runner};
use axum::extract::State;
use axum::routing::post;
use axum::Router;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// Route the push webhook is delivered to
pub const PAYLOAD_PATH: &str = "/payload";

/// Port the receiver listens on unless told otherwise
pub const DEFAULT_PORT: u16 = 5000;

/// Body of every webhook response
pub const ACKNOWLEDGEMENT: &str = "OK";

/// Build the receiver's routes around a shared runner
pub fn router<H: ActionHandler + 'static>(runner: Arc<Runner<H>>) -> Router {
    Router::new()
        .route(PAYLOAD_PATH, post(payload::<H>))
        .with_state(runner)
}

async fn payload<H: ActionHandler + 'static>(
    State(runner): State<Arc<Runner<H>>>,
    body: String,
) -> &'static str {
    info!("received payload");
    debug!(%body);

    match PushEvent::from_json(&body) {
        Ok(event) => {
            let repository = event.repository.name.clone();
            let git_ref = event.git_ref.clone();
            // The handle is dropped; the run continues in the background
            if runner.trigger(event).is_some() {
                info!(%repository, %git_ref, "run triggered");
            }
        }
        Err(e) => warn!("ignoring payload that is not a push event: {}", e),
    }

    ACKNOWLEDGEMENT
}

/// Serve the webhook receiver on `addr` until the task is dropped
pub async fn serve<H: ActionHandler + 'static>(runner: Arc<Runner<H>>, addr: SocketAddr) -> io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("listening for webhooks on {}", listener.local_addr()?);

    axum::serve(listener, router(runner)).await
}
