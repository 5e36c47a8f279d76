//! Applies poll loop callbacks to the session that started the loop.

use std::sync::Weak;

use crate::error::Error;
use crate::poller::PollListener;
use crate::types::{ControllerState, Event, StatusSnapshot, Task};

use super::{ControllerInner, Session};

/// Poll listener bound to one session generation
///
/// Holds only a weak reference so a running loop never keeps a dropped
/// controller alive.
pub(super) struct SessionListener {
    inner: Weak<ControllerInner>,
    generation: u64,
    file_name: String,
}

impl SessionListener {
    pub(super) fn new(inner: Weak<ControllerInner>, generation: u64, file_name: &str) -> Self {
        Self {
            inner,
            generation,
            file_name: file_name.to_string(),
        }
    }

    /// Run `apply` on the session if it still belongs to this listener's attempt
    fn with_session(&self, task: &Task, apply: impl FnOnce(&ControllerInner, &mut Session)) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let mut session = inner.lock_session();

        let current = session.generation == self.generation
            && matches!(session.state, ControllerState::Polling { .. });
        if !current {
            tracing::trace!(
                task_id = %task.id,
                generation = self.generation,
                current_generation = session.generation,
                "Ignoring callback from a superseded poll loop"
            );
            return;
        }

        apply(inner.as_ref(), &mut *session);
    }

    /// Fill in the file name when the service omits it
    fn complete(&self, mut snapshot: StatusSnapshot) -> StatusSnapshot {
        if snapshot.original_filename.is_empty() {
            snapshot.original_filename = self.file_name.clone();
        }
        snapshot
    }
}

impl PollListener for SessionListener {
    fn on_snapshot(&self, task: &Task, snapshot: &StatusSnapshot) {
        self.with_session(task, |inner, session| {
            inner.emit(Event::Progress {
                task_id: task.id.clone(),
                percent: snapshot.progress,
            });
            inner.transition(
                session,
                ControllerState::Polling {
                    task: task.clone(),
                    snapshot: self.complete(snapshot.clone()),
                },
            );
        });
    }

    fn on_terminal(&self, task: &Task, snapshot: StatusSnapshot) {
        self.with_session(task, |inner, session| {
            // the loop has already stopped itself
            session.poll.take();

            let snapshot = self.complete(snapshot);
            tracing::info!(
                task_id = %task.id,
                result_url = snapshot.result_url.as_deref(),
                processing_secs = snapshot.processing_seconds(),
                "Upload completed"
            );

            let result_url = snapshot.result_url.clone();
            inner.transition(session, ControllerState::Result { snapshot });
            inner.emit(Event::Completed {
                task_id: task.id.clone(),
                result_url,
            });
        });
    }

    fn on_error(&self, task: &Task, error: Error) {
        self.with_session(task, |inner, session| {
            inner.fail(session, Some(task.id.clone()), &error);
        });
    }
}
