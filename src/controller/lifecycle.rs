//! Submitting, resetting and awaiting an upload.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::{
    ControllerState, Event, MediaFile, Outcome, Phase, StatusSnapshot, Task, TransformSettings,
    UploadRequest,
};
use crate::validation;

use super::listener::SessionListener;
use super::{Session, UploadController};

impl UploadController {
    /// Start a new upload attempt
    ///
    /// Validates the file, uploads it and starts polling the accepted job.
    /// Returns as soon as the service has accepted the job; progress and the
    /// final result are published through [`watch`](Self::watch) and
    /// [`subscribe`](Self::subscribe).
    ///
    /// A controller showing a result or an error is reset first. While another
    /// attempt is validating, uploading or polling this returns [`Error::Busy`];
    /// use [`restart`](Self::restart) to replace it.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if the file is refused (no network call is made)
    /// - [`Error::Submission`] if the upload fails or is rejected
    /// - [`Error::Cancelled`] if the controller was reset while the upload was in flight
    ///
    /// Validation and submission failures also move the controller to
    /// [`ControllerState::Error`].
    pub async fn submit(&self, file: MediaFile, settings: TransformSettings) -> Result<Task> {
        let generation = {
            let mut session = self.inner.lock_session();
            match session.state.phase() {
                Phase::Idle => {}
                Phase::Result | Phase::Error => self.reset_locked(&mut session),
                phase => return Err(Error::Busy { phase }),
            }
            self.begin(&mut session, file.clone())
        };

        self.proceed(generation, file, settings).await
    }

    /// Reset, then submit a new file
    ///
    /// Any in-flight attempt is cancelled first; its late results are discarded.
    /// The reset and the start of the new attempt happen atomically, so a
    /// concurrent [`submit`](Self::submit) cannot slip in between and make this
    /// return [`Error::Busy`].
    pub async fn restart(&self, file: MediaFile, settings: TransformSettings) -> Result<Task> {
        let generation = {
            let mut session = self.inner.lock_session();
            self.reset_locked(&mut session);
            self.begin(&mut session, file.clone())
        };

        self.proceed(generation, file, settings).await
    }

    /// Validate, upload and start polling for the attempt tagged `generation`
    async fn proceed(
        &self,
        generation: u64,
        file: MediaFile,
        settings: TransformSettings,
    ) -> Result<Task> {
        let request = match self.validate(&file, settings) {
            Ok(request) => request,
            Err(e) => {
                let mut session = self.inner.lock_session();
                if session.generation == generation {
                    self.inner.fail(&mut session, None, &e);
                }
                return Err(e);
            }
        };

        {
            let mut session = self.inner.lock_session();
            if session.generation != generation {
                return Err(Error::Cancelled);
            }
            self.inner.transition(
                &mut session,
                ControllerState::Uploading {
                    file_name: file.file_name().to_string(),
                    media_kind: request.media_kind(),
                },
            );
        }

        let submitted = self.inner.submitter.submit(&request).await;

        let mut session = self.inner.lock_session();
        if session.generation != generation {
            tracing::debug!(
                file_name = file.file_name(),
                "Discarding submission result of a superseded upload"
            );
            return Err(Error::Cancelled);
        }

        let task = match submitted {
            Ok(task) => task,
            Err(e) => {
                let e = Error::Submission(e);
                self.inner.fail(&mut session, None, &e);
                return Err(e);
            }
        };

        self.start_polling(&mut session, generation, &task, &request);
        Ok(task)
    }

    /// Return to Idle from any state
    ///
    /// Stops the poll loop and forgets the current task and file. Safe to call
    /// at any time, including when already idle.
    pub fn reset(&self) {
        let mut session = self.inner.lock_session();
        self.reset_locked(&mut session);
    }

    /// Wait until the current attempt ends
    ///
    /// Returns [`Outcome::Cancelled`] if the controller is (or becomes) idle
    /// before a result or an error is shown.
    pub async fn wait_for_outcome(&self) -> Outcome {
        let mut rx = self.watch();
        let settled = rx
            .wait_for(|state| state.is_terminal() || matches!(state, ControllerState::Idle))
            .await;

        match settled.as_deref() {
            Ok(ControllerState::Result { snapshot }) => Outcome::Completed(snapshot.clone()),
            Ok(ControllerState::Error { message }) => Outcome::Failed(message.clone()),
            _ => Outcome::Cancelled,
        }
    }

    /// Submit a file and wait for the attempt to end
    ///
    /// Failures of the attempt itself are reported as [`Outcome::Failed`];
    /// only [`Error::Busy`] is returned as an error.
    pub async fn run(&self, file: MediaFile, settings: TransformSettings) -> Result<Outcome> {
        match self.submit(file, settings).await {
            Ok(task) => {
                tracing::debug!(task_id = %task.id, "Waiting for upload outcome");
                Ok(self.wait_for_outcome().await)
            }
            Err(e @ Error::Busy { .. }) => Err(e),
            Err(Error::Cancelled) => Ok(Outcome::Cancelled),
            Err(e) => Ok(Outcome::Failed(e.to_string())),
        }
    }

    fn begin(&self, session: &mut Session, file: MediaFile) -> u64 {
        session.generation += 1;
        let file_name = file.file_name().to_string();
        session.file = Some(file);

        tracing::info!(
            file_name = %file_name,
            generation = session.generation,
            "Upload attempt started"
        );
        self.inner
            .transition(session, ControllerState::Validating { file_name });
        session.generation
    }

    fn validate(&self, file: &MediaFile, settings: TransformSettings) -> Result<UploadRequest> {
        let kind = validation::validate(file)?;
        Ok(UploadRequest::new(file.clone(), kind, settings)?)
    }

    fn start_polling(
        &self,
        session: &mut Session,
        generation: u64,
        task: &Task,
        request: &UploadRequest,
    ) {
        session.task = Some(task.clone());
        self.inner.transition(
            session,
            ControllerState::Polling {
                task: task.clone(),
                snapshot: StatusSnapshot::initial(request),
            },
        );
        self.inner.emit(Event::Submitted {
            task_id: task.id.clone(),
        });

        let listener = SessionListener::new(
            Arc::downgrade(&self.inner),
            generation,
            request.file().file_name(),
        );
        let handle = self
            .inner
            .poller
            .start_loop(task.clone(), Arc::new(listener));

        if let Some(previous) = session.poll.replace(handle) {
            previous.stop();
        }
    }

    fn reset_locked(&self, session: &mut Session) {
        session.generation += 1;
        if let Some(handle) = session.poll.take() {
            handle.stop();
        }
        let task = session.task.take();
        session.file = None;

        if session.state != ControllerState::Idle {
            tracing::info!(
                task_id = task.as_ref().map(|t| t.id.as_str()),
                from = %session.state.phase(),
                "Upload controller reset"
            );
        }
        self.inner.transition(session, ControllerState::Idle);
        self.inner.emit(Event::Reset);
    }
}
