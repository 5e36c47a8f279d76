//! Job creation: one upload request per validated file, never retried.

use std::sync::Arc;

use crate::api::ProcessingApi;
use crate::error::SubmissionError;
use crate::types::{MediaKind, Task, UploadRequest};

/// Issues the creation request for a validated upload
#[derive(Clone)]
pub struct JobSubmitter {
    api: Arc<dyn ProcessingApi>,
}

impl JobSubmitter {
    /// Create a submitter backed by the given processing API
    pub fn new(api: Arc<dyn ProcessingApi>) -> Self {
        Self { api }
    }

    /// Upload the file and return the task the service created for it.
    ///
    /// Transport failures and server-reported errors are returned unchanged;
    /// a failed submission ends the attempt.
    pub async fn submit(&self, request: &UploadRequest) -> Result<Task, SubmissionError> {
        tracing::info!(
            file_name = request.file().file_name(),
            size_bytes = request.file().size(),
            strength = request.transform_strength(),
            steps = request.steps(),
            "Submitting style-transfer job"
        );

        let accepted = self.api.create_job(request).await.inspect_err(|e| {
            tracing::warn!(
                file_name = request.file().file_name(),
                error = %e,
                "Job submission failed"
            );
        })?;

        if let Some(message) = &accepted.message {
            tracing::debug!(
                task_id = %accepted.task_id,
                service_message = %message,
                "Service accepted upload"
            );
        }
        if let Some(is_video) = accepted.is_video
            && is_video != (request.media_kind() == MediaKind::Video)
        {
            tracing::warn!(
                task_id = %accepted.task_id,
                service_is_video = is_video,
                declared_kind = ?request.media_kind(),
                "Service classified the upload differently from its declared content type"
            );
        }

        let task = Task::new(accepted.task_id);
        tracing::info!(task_id = %task.id, "Job submitted");
        Ok(task)
    }
}
