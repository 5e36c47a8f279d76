//! Status polling for an accepted job.
//!
//! The loop polls once immediately, then schedules each following request
//! `interval` after the previous one resolved, so requests for the same task
//! never overlap. It stops on the first terminal snapshot or the first error
//! and reports through a [`PollListener`].

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::api::ProcessingApi;
use crate::config::PollingConfig;
use crate::error::{Error, PollError};
use crate::types::{JobPhase, StatusSnapshot, Task, TaskId};

/// Message used when the service reports a failure without details
pub const DEFAULT_FAILURE_MESSAGE: &str = "Processing failed";

/// Receives the results of a poll loop.
///
/// After `on_terminal` or `on_error` the loop has already stopped; no further
/// calls follow. A loop stopped through its [`PollHandle`] makes no further calls.
pub trait PollListener: Send + Sync {
    /// Every successfully decoded snapshot, terminal or not
    fn on_snapshot(&self, task: &Task, snapshot: &StatusSnapshot);

    /// The job completed
    fn on_terminal(&self, task: &Task, snapshot: StatusSnapshot);

    /// The job failed, or the loop could not continue
    fn on_error(&self, task: &Task, error: Error);
}

/// Handle to a running poll loop
///
/// Dropping the handle stops the loop.
#[derive(Debug, Default)]
pub struct PollHandle {
    task_id: Option<TaskId>,
    token: CancellationToken,
}

impl PollHandle {
    /// Task the loop is polling, if the handle was ever started
    pub fn task_id(&self) -> Option<&TaskId> {
        self.task_id.as_ref()
    }

    /// Stop the loop. Safe to call repeatedly or on a handle that never started.
    pub fn stop(&self) {
        if self.token.is_cancelled() {
            return;
        }
        if let Some(task_id) = &self.task_id {
            tracing::debug!(%task_id, "Stopping status poll loop");
        }
        self.token.cancel();
    }

    /// Whether the loop has stopped (by request or on its own)
    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Queries job status, once or in a loop
#[derive(Clone)]
pub struct StatusPoller {
    api: Arc<dyn ProcessingApi>,
    interval: Duration,
    max_duration: Option<Duration>,
}

impl StatusPoller {
    /// Create a poller using the given API and polling settings
    pub fn new(api: Arc<dyn ProcessingApi>, config: &PollingConfig) -> Self {
        Self {
            api,
            interval: config.interval,
            max_duration: config.max_duration,
        }
    }

    /// Delay between the resolution of one request and the next
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Issue a single status request for the task
    pub async fn poll(&self, task: &Task) -> Result<StatusSnapshot, PollError> {
        self.api.job_status(&task.id).await
    }

    /// Spawn a poll loop for the task on the current tokio runtime
    pub fn start_loop(&self, task: Task, listener: Arc<dyn PollListener>) -> PollHandle {
        let token = CancellationToken::new();
        let handle = PollHandle {
            task_id: Some(task.id.clone()),
            token: token.clone(),
        };

        tracing::debug!(
            task_id = %task.id,
            interval_ms = self.interval.as_millis() as u64,
            "Starting status poll loop"
        );
        tokio::spawn(self.clone().run_loop(task, listener, token));

        handle
    }

    async fn run_loop(
        self,
        task: Task,
        listener: Arc<dyn PollListener>,
        token: CancellationToken,
    ) {
        let started = Instant::now();

        loop {
            let result = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                result = self.poll(&task) => result,
            };

            // stop() may have raced with the request resolving
            if token.is_cancelled() {
                break;
            }

            let snapshot = match result {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::warn!(task_id = %task.id, error = %e, "Status check failed");
                    token.cancel();
                    listener.on_error(&task, Error::Poll(e));
                    break;
                }
            };

            tracing::trace!(
                task_id = %task.id,
                progress = snapshot.progress,
                phase = ?snapshot.phase,
                "Status received"
            );
            listener.on_snapshot(&task, &snapshot);

            match snapshot.phase {
                JobPhase::Completed => {
                    tracing::info!(task_id = %task.id, "Job completed");
                    token.cancel();
                    listener.on_terminal(&task, snapshot);
                    break;
                }
                JobPhase::Failed => {
                    let message = snapshot
                        .error_message
                        .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string());
                    tracing::warn!(task_id = %task.id, error = %message, "Job failed");
                    token.cancel();
                    listener.on_error(
                        &task,
                        Error::JobFailed {
                            task_id: task.id.clone(),
                            message,
                        },
                    );
                    break;
                }
                JobPhase::Pending => {
                    if let Some(message) = snapshot.error_message {
                        tracing::warn!(task_id = %task.id, error = %message, "Service reported an error");
                        token.cancel();
                        listener.on_error(&task, Error::Poll(PollError::Rejected(message)));
                        break;
                    }
                }
            }

            if let Some(limit) = self.max_duration
                && started.elapsed() >= limit
            {
                let elapsed = started.elapsed();
                tracing::warn!(task_id = %task.id, elapsed_secs = elapsed.as_secs(), "Polling deadline exceeded");
                token.cancel();
                listener.on_error(&task, Error::Poll(PollError::DeadlineExceeded { elapsed }));
                break;
            }

            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        tracing::debug!(task_id = %task.id, "Status poll loop finished");
    }
}
