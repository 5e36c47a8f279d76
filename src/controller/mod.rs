//! Upload lifecycle controller split into focused submodules.
//!
//! The `UploadController` struct and its methods are organized by concern:
//! - [`lifecycle`] - Submitting, resetting and awaiting an upload
//! - [`listener`] - Applying poll loop callbacks to the current session

mod lifecycle;
mod listener;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::{broadcast, watch};
use url::Url;

use crate::api::{HttpProcessingApi, ProcessingApi};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::poller::{PollHandle, StatusPoller};
use crate::submitter::JobSubmitter;
use crate::types::{ControllerState, Event, MediaFile, StatusSnapshot, Task, TaskId};
use crate::utils;

/// Everything that belongs to one upload attempt
///
/// Guarded by a single mutex so the task slot, the poll handle and the state
/// always change together.
#[derive(Debug, Default)]
pub(crate) struct Session {
    /// Bumped whenever an attempt starts or is reset; callbacks carrying an
    /// older generation are discarded
    pub(crate) generation: u64,
    /// Current state (mirrored into the watch channel on every change)
    pub(crate) state: ControllerState,
    /// Task accepted by the service for this attempt
    pub(crate) task: Option<Task>,
    /// Poll loop observing `task`
    pub(crate) poll: Option<PollHandle>,
    /// File selected for this attempt
    pub(crate) file: Option<MediaFile>,
}

pub(crate) struct ControllerInner {
    pub(crate) config: Arc<Config>,
    pub(crate) base_url: Url,
    pub(crate) submitter: JobSubmitter,
    pub(crate) poller: StatusPoller,
    pub(crate) session: Mutex<Session>,
    pub(crate) state_tx: watch::Sender<ControllerState>,
    pub(crate) event_tx: broadcast::Sender<Event>,
}

/// Drives one upload at a time through validation, submission and polling
///
/// Cloneable; all clones share the same session.
#[derive(Clone)]
pub struct UploadController {
    pub(crate) inner: Arc<ControllerInner>,
}

/// Non-owning handle to an [`UploadController`]
#[derive(Clone)]
pub struct WeakUploadController {
    inner: Weak<ControllerInner>,
}

impl WeakUploadController {
    /// The controller, if any clone of it is still alive
    pub fn upgrade(&self) -> Option<UploadController> {
        self.inner.upgrade().map(|inner| UploadController { inner })
    }
}

impl UploadController {
    /// Create a controller talking to the service named in `config`
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let api = HttpProcessingApi::new(&config.api)?;
        let base_url = api.base_url().clone();
        Ok(Self::build(config, Arc::new(api), base_url))
    }

    /// Create a controller backed by a custom [`ProcessingApi`] implementation
    ///
    /// `config.api.base_url` is still used to resolve relative result URLs.
    pub fn with_api(config: Config, api: Arc<dyn ProcessingApi>) -> Result<Self> {
        config.validate()?;
        let base_url = utils::with_trailing_slash(Url::parse(&config.api.base_url)?);
        Ok(Self::build(config, api, base_url))
    }

    fn build(config: Config, api: Arc<dyn ProcessingApi>, base_url: Url) -> Self {
        let (state_tx, _state_rx) = watch::channel(ControllerState::Idle);
        // 64 events is plenty for a single attempt; slow subscribers see Lagged
        let (event_tx, _event_rx) = broadcast::channel(64);

        tracing::debug!(
            base_url = %base_url,
            poll_interval_ms = config.polling.interval.as_millis() as u64,
            "Upload controller created"
        );

        Self {
            inner: Arc::new(ControllerInner {
                submitter: JobSubmitter::new(api.clone()),
                poller: StatusPoller::new(api, &config.polling),
                config: Arc::new(config),
                base_url,
                session: Mutex::new(Session::default()),
                state_tx,
                event_tx,
            }),
        }
    }

    /// Handle that does not keep the controller (or its poll loop) alive
    pub fn downgrade(&self) -> WeakUploadController {
        WeakUploadController {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Snapshot of the current state
    pub fn state(&self) -> ControllerState {
        self.inner.state_tx.borrow().clone()
    }

    /// Receiver that observes every state change, including progress updates
    pub fn watch(&self) -> watch::Receiver<ControllerState> {
        self.inner.state_tx.subscribe()
    }

    /// Subscribe to controller events
    ///
    /// Each subscriber receives all events independently. A subscriber more
    /// than 64 events behind receives `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.inner.event_tx.subscribe()
    }

    /// Task of the current attempt, once the service has accepted it
    pub fn current_task(&self) -> Option<Task> {
        self.inner.lock_session().task.clone()
    }

    /// File of the current attempt
    pub fn current_file(&self) -> Option<MediaFile> {
        self.inner.lock_session().file.clone()
    }

    /// Whether a poll loop is currently running
    pub fn is_polling(&self) -> bool {
        self.inner
            .lock_session()
            .poll
            .as_ref()
            .is_some_and(|handle| !handle.is_stopped())
    }

    /// Configuration the controller was built with
    pub fn config(&self) -> Arc<Config> {
        Arc::clone(&self.inner.config)
    }

    /// Absolute URL of a snapshot's result, resolved against the service base URL
    pub fn result_media_url(&self, snapshot: &StatusSnapshot) -> Result<Option<Url>> {
        snapshot
            .result_url
            .as_deref()
            .map(|reference| utils::resolve_reference(&self.inner.base_url, reference))
            .transpose()
            .map_err(Error::from)
    }
}

impl ControllerInner {
    pub(crate) fn lock_session(&self) -> MutexGuard<'_, Session> {
        // no code path panics while holding the lock, but stay usable if one ever does
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Emit an event to all subscribers (dropped when nobody listens)
    pub(crate) fn emit(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Replace the session state and publish it
    pub(crate) fn transition(&self, session: &mut Session, next: ControllerState) {
        let from = session.state.phase();
        let to = next.phase();

        session.state = next.clone();
        self.state_tx.send_replace(next);

        if from != to {
            tracing::debug!(%from, %to, generation = session.generation, "Controller state changed");
            self.emit(Event::StateChanged { from, to });
        }
    }

    /// End the current attempt with an error
    pub(crate) fn fail(&self, session: &mut Session, task_id: Option<TaskId>, error: &Error) {
        if let Some(handle) = session.poll.take() {
            handle.stop();
        }

        tracing::warn!(
            task_id = task_id.as_ref().map(|id| id.as_str()),
            code = error.code(),
            error = %error,
            "Upload attempt failed"
        );

        self.transition(
            session,
            ControllerState::Error {
                message: error.to_string(),
            },
        );
        self.emit(Event::Failed {
            task_id,
            code: error.code().to_string(),
            error: error.to_string(),
        });
    }
}
