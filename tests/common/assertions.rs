//! Custom test assertions for integration tests

use std::time::Duration;
use ghibli_client::{Event, Outcome, UploadController};
use tokio::sync::broadcast;

/// Wait for the current attempt to end, failing the test after `timeout`
pub async fn wait_for_outcome(controller: &UploadController, timeout: Duration) -> Outcome {
    tokio::time::timeout(timeout, controller.wait_for_outcome())
        .await
        .expect("upload did not reach a terminal state in time")
}

/// Collect every progress percentage seen on an event receiver so far
pub fn progress_seen(events: &mut broadcast::Receiver<Event>) -> Vec<u8> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let Event::Progress { percent, .. } = event {
            seen.push(percent);
        }
    }
    seen
}

/// Number of requests the mock server received for `path`
pub async fn requests_to(server: &wiremock::MockServer, path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == path)
        .count()
}
