//! REST client for the style-transfer processing service.
//!
//! Wraps the service's two job endpoints using [`reqwest`]:
//! - `POST /upload` (multipart `file`, `strength`, `steps`) returns `{task_id}` or `{error}`
//! - `GET /status/{task_id}` returns the job's current status
//!
//! The [`ProcessingApi`] trait is the seam between the lifecycle controller and
//! the network, so the controller can be driven by any implementation.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, StatusCode};
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use url::Url;

use crate::config::ApiConfig;
use crate::error::{Error, PollError, Result, SubmissionError};
use crate::types::{JobPhase, StatusSnapshot, TaskId, UploadRequest};
use crate::utils;

/// Operations the lifecycle controller needs from the processing service
#[async_trait]
pub trait ProcessingApi: Send + Sync {
    /// Upload a file and start a processing job
    async fn create_job(
        &self,
        request: &UploadRequest,
    ) -> std::result::Result<UploadAccepted, SubmissionError>;

    /// Fetch the current status of a job
    async fn job_status(&self, task_id: &TaskId)
    -> std::result::Result<StatusSnapshot, PollError>;
}

/// Successful answer to an upload
#[derive(Clone, Debug, PartialEq)]
pub struct UploadAccepted {
    /// Server-assigned identifier for the new job
    pub task_id: TaskId,
    /// Informational message from the service
    pub message: Option<String>,
    /// Whether the service classified the upload as a video
    pub is_video: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    task_id: Option<String>,
    error: Option<String>,
    message: Option<String>,
    is_video: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: Option<JobPhase>,
    #[serde(default, deserialize_with = "lenient_progress")]
    progress: u8,
    error: Option<String>,
    result_url: Option<String>,
    is_video: Option<bool>,
    original_filename: Option<String>,
    processing_time: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

impl StatusResponse {
    fn into_snapshot(self) -> std::result::Result<StatusSnapshot, PollError> {
        let Some(phase) = self.status else {
            return Err(match self.error {
                Some(message) => PollError::Rejected(message),
                None => PollError::Decode("response did not include a status".to_string()),
            });
        };

        Ok(StatusSnapshot {
            progress: self.progress,
            phase,
            result_url: self.result_url,
            is_video: self.is_video.unwrap_or(false),
            original_filename: self.original_filename.unwrap_or_default(),
            processing_time_seconds: self.processing_time,
            error_message: self.error,
        })
    }
}

/// Accept integer or fractional percentages, clamped to 0..=100
fn lenient_progress<'de, D>(deserializer: D) -> std::result::Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value
        .filter(|v| v.is_finite())
        .map(|v| v.round().clamp(0.0, 100.0) as u8)
        .unwrap_or(0))
}

/// HTTP client for one processing service instance
///
/// Status and health requests are bounded by `request_timeout`; uploads only
/// by `upload_timeout`, so a large file on a slow link is not cut off.
#[derive(Clone, Debug)]
pub struct HttpProcessingApi {
    client: reqwest::Client,
    base_url: Url,
    request_timeout: Option<Duration>,
    upload_timeout: Option<Duration>,
}

impl HttpProcessingApi {
    /// Create a client from connection settings
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let client = builder.build()?;

        let mut api = Self::with_client(client, Url::parse(&config.base_url)?)?;
        api.request_timeout = config.request_timeout;
        api.upload_timeout = config.upload_timeout;
        Ok(api)
    }

    /// Create a client reusing an existing [`reqwest::Client`]
    ///
    /// No per-request timeouts are added; the client's own settings apply.
    pub fn with_client(client: reqwest::Client, base_url: Url) -> Result<Self> {
        if base_url.cannot_be_a_base() {
            return Err(Error::Config {
                message: format!("'{}' cannot be used as a base URL", base_url),
                key: Some("base_url".to_string()),
            });
        }

        Ok(Self {
            client,
            base_url: utils::with_trailing_slash(base_url),
            request_timeout: None,
            upload_timeout: None,
        })
    }

    /// Base URL all endpoints are resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Check that the service is up (`GET /health` answering `{"status": "ok"}`)
    pub async fn health(&self) -> Result<bool> {
        let response = with_timeout(
            self.client.get(self.endpoint(&["health"])),
            self.request_timeout,
        )
        .send()
        .await?;

        if !response.status().is_success() {
            return Ok(false);
        }

        let body: HealthResponse = response.json().await?;
        Ok(body.status == "ok")
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // cannot-be-a-base URLs are refused in `with_client`
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn upload_form(request: &UploadRequest) -> std::result::Result<Form, reqwest::Error> {
        let file = request.file();
        let part = Part::stream_with_length(reqwest::Body::from(file.data().clone()), file.size())
            .file_name(file.file_name().to_string())
            .mime_str(file.content_type())?;

        let mut form = Form::new().part("file", part);
        for (name, value) in request.form_fields() {
            form = form.text(name, value);
        }
        Ok(form)
    }
}

#[async_trait]
impl ProcessingApi for HttpProcessingApi {
    async fn create_job(
        &self,
        request: &UploadRequest,
    ) -> std::result::Result<UploadAccepted, SubmissionError> {
        let form = Self::upload_form(request).map_err(SubmissionError::Transport)?;
        let url = self.endpoint(&["upload"]);
        tracing::debug!(%url, file_name = request.file().file_name(), "Sending upload request");

        let response = with_timeout(self.client.post(url).multipart(form), self.upload_timeout)
            .send()
            .await
            .map_err(SubmissionError::Transport)?;

        let status = response.status();
        let body = response.text().await.map_err(SubmissionError::Transport)?;

        match serde_json::from_str::<UploadResponse>(&body) {
            Ok(UploadResponse {
                error: Some(error), ..
            }) => Err(SubmissionError::Rejected(error)),
            Ok(parsed) if status.is_success() => match parsed.task_id {
                Some(task_id) if !task_id.is_empty() => Ok(UploadAccepted {
                    task_id: TaskId::from(task_id),
                    message: parsed.message,
                    is_video: parsed.is_video,
                }),
                _ => Err(SubmissionError::Decode(
                    "response did not include a task_id".to_string(),
                )),
            },
            Ok(_) => Err(http_submission_error(status, body)),
            Err(e) if status.is_success() => Err(SubmissionError::Decode(e.to_string())),
            Err(_) => Err(http_submission_error(status, body)),
        }
    }

    async fn job_status(
        &self,
        task_id: &TaskId,
    ) -> std::result::Result<StatusSnapshot, PollError> {
        let url = self.endpoint(&["status", task_id.as_str()]);
        tracing::trace!(%url, "Sending status request");

        let response = with_timeout(self.client.get(url), self.request_timeout)
            .send()
            .await
            .map_err(PollError::Transport)?;

        let status = response.status();
        let body = response.text().await.map_err(PollError::Transport)?;

        match serde_json::from_str::<StatusResponse>(&body) {
            Ok(parsed) if status.is_success() => parsed.into_snapshot(),
            Ok(StatusResponse {
                error: Some(error), ..
            }) => Err(PollError::Rejected(error)),
            Ok(_) => Err(PollError::Http {
                status: status.as_u16(),
                body,
            }),
            Err(e) if status.is_success() => Err(PollError::Decode(e.to_string())),
            Err(_) => Err(PollError::Http {
                status: status.as_u16(),
                body,
            }),
        }
    }
}

fn with_timeout(request: RequestBuilder, timeout: Option<Duration>) -> RequestBuilder {
    match timeout {
        Some(timeout) => request.timeout(timeout),
        None => request,
    }
}

fn http_submission_error(status: StatusCode, body: String) -> SubmissionError {
    SubmissionError::Http {
        status: status.as_u16(),
        body,
    }
}
