//! Shared test helpers for driving an UploadController against a scripted API.

use crate::api::{ProcessingApi, UploadAccepted};
use crate::config::{Config, PollingConfig};
use crate::controller::UploadController;
use crate::error::{PollError, SubmissionError};
use crate::types::{JobPhase, MediaFile, StatusSnapshot, TaskId, UploadRequest};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

type StatusAnswer = Result<StatusSnapshot, PollError>;

/// In-memory processing service with scripted answers.
///
/// Uploads hand out task ids `task-1`, `task-2`, ... unless an upload error is
/// queued. Status answers are served in order per task; once a task's queue is
/// empty its last answer repeats.
#[derive(Default)]
pub(crate) struct ScriptedApi {
    upload_errors: Mutex<VecDeque<SubmissionError>>,
    statuses: Mutex<std::collections::HashMap<String, VecDeque<StatusAnswer>>>,
    repeat: Mutex<std::collections::HashMap<String, StatusSnapshot>>,
    /// When set, each upload waits for one permit before answering
    upload_gate: Option<Arc<Semaphore>>,
    pub(crate) uploads: AtomicUsize,
    pub(crate) status_calls: Mutex<Vec<String>>,
    pub(crate) uploaded_fields: Mutex<Vec<[(&'static str, String); 2]>>,
}

impl ScriptedApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Uploads block until the returned semaphore hands out a permit
    pub(crate) fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let api = Self {
            upload_gate: Some(gate.clone()),
            ..Self::default()
        };
        (api, gate)
    }

    pub(crate) fn fail_next_upload(&self, error: SubmissionError) {
        self.upload_errors.lock().unwrap().push_back(error);
    }

    /// Queue status answers for a task; the last successful one repeats
    pub(crate) fn script(&self, task_id: &str, answers: Vec<StatusAnswer>) {
        let mut repeat = self.repeat.lock().unwrap();
        for answer in answers.iter().flatten() {
            repeat.insert(task_id.to_string(), answer.clone());
        }
        self.statuses
            .lock()
            .unwrap()
            .entry(task_id.to_string())
            .or_default()
            .extend(answers);
    }

    pub(crate) fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub(crate) fn status_calls_for(&self, task_id: &str) -> usize {
        self.status_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|id| id.as_str() == task_id)
            .count()
    }
}

#[async_trait]
impl ProcessingApi for ScriptedApi {
    async fn create_job(&self, request: &UploadRequest) -> Result<UploadAccepted, SubmissionError> {
        let n = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        self.uploaded_fields
            .lock()
            .unwrap()
            .push(request.form_fields());

        if let Some(gate) = &self.upload_gate {
            gate.acquire().await.unwrap().forget();
        }

        if let Some(error) = self.upload_errors.lock().unwrap().pop_front() {
            return Err(error);
        }

        Ok(UploadAccepted {
            task_id: TaskId::new(format!("task-{n}")),
            message: Some("File uploaded successfully. Processing started.".into()),
            is_video: None,
        })
    }

    async fn job_status(&self, task_id: &TaskId) -> Result<StatusSnapshot, PollError> {
        self.status_calls
            .lock()
            .unwrap()
            .push(task_id.as_str().to_string());

        let next = self
            .statuses
            .lock()
            .unwrap()
            .get_mut(task_id.as_str())
            .and_then(VecDeque::pop_front);

        match next {
            Some(answer) => answer,
            None => match self.repeat.lock().unwrap().get(task_id.as_str()) {
                Some(snapshot) => Ok(snapshot.clone()),
                None => Err(PollError::Rejected("Task not found".into())),
            },
        }
    }
}

/// Controller with a one second poll interval over the given API
pub(crate) fn controller_with(api: Arc<ScriptedApi>) -> UploadController {
    let config = Config {
        polling: PollingConfig {
            interval: Duration::from_secs(1),
            max_duration: None,
        },
        ..Default::default()
    };
    UploadController::with_api(config, api).unwrap()
}

pub(crate) fn jpeg(name: &str) -> MediaFile {
    MediaFile::new(name, "image/jpeg", vec![0u8; 2_000_000])
}

pub(crate) fn pending(progress: u8) -> StatusSnapshot {
    StatusSnapshot {
        progress,
        phase: JobPhase::Pending,
        result_url: None,
        is_video: false,
        original_filename: "cat.jpg".into(),
        processing_time_seconds: None,
        error_message: None,
    }
}

pub(crate) fn completed(result_url: &str) -> StatusSnapshot {
    StatusSnapshot {
        progress: 100,
        phase: JobPhase::Completed,
        result_url: Some(result_url.into()),
        processing_time_seconds: Some(42.3),
        ..pending(100)
    }
}

pub(crate) fn failed(message: &str) -> StatusSnapshot {
    StatusSnapshot {
        phase: JobPhase::Failed,
        error_message: Some(message.into()),
        ..pending(40)
    }
}

/// Wait until the controller reaches `phase`
pub(crate) async fn wait_for_phase(controller: &UploadController, phase: crate::types::Phase) {
    let mut rx = controller.watch();
    rx.wait_for(|state| state.phase() == phase).await.unwrap();
}

/// Drain buffered events without waiting
pub(crate) fn drain(rx: &mut tokio::sync::broadcast::Receiver<crate::types::Event>) -> Vec<crate::types::Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
