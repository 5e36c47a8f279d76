//! Core types for ghibli-client

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, ValidationError};
use crate::utils;

/// Opaque server-assigned identifier for one processing job
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Create a new TaskId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One in-flight processing job
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Server-assigned identifier
    pub id: TaskId,
    /// When the job was accepted by the service
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Create a task accepted just now
    pub fn new(id: TaskId) -> Self {
        Self {
            id,
            created_at: Utc::now(),
        }
    }
}

/// Kind of media being transformed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Still image
    Image,
    /// Video clip
    Video,
}

impl MediaKind {
    /// Classify a declared content type such as `image/png` or `video/mp4`
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let content_type = content_type.trim().to_ascii_lowercase();
        if content_type.starts_with("image/") {
            Some(MediaKind::Image)
        } else if content_type.starts_with("video/") {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    /// Label shown next to the progress bar
    pub fn label(&self) -> &'static str {
        match self {
            MediaKind::Image => "Image",
            MediaKind::Video => "Video",
        }
    }

    /// Expectation shown while the job is processing
    pub fn processing_hint(&self) -> &'static str {
        match self {
            MediaKind::Image => "Image processing typically takes 30-60 seconds",
            MediaKind::Video => {
                "Video processing may take several minutes depending on length and resolution"
            }
        }
    }
}

/// Named quality shorthand mapped to the number of diffusion steps
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityPreset {
    /// 15 steps
    Fast,
    /// 20 steps (default)
    #[default]
    Balanced,
    /// 30 steps
    Quality,
}

impl QualityPreset {
    /// Step count sent to the processing service
    pub fn steps(&self) -> u32 {
        match self {
            QualityPreset::Fast => 15,
            QualityPreset::Balanced => 20,
            QualityPreset::Quality => 30,
        }
    }
}

impl std::fmt::Display for QualityPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QualityPreset::Fast => write!(f, "fast"),
            QualityPreset::Balanced => write!(f, "balanced"),
            QualityPreset::Quality => write!(f, "quality"),
        }
    }
}

impl std::str::FromStr for QualityPreset {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(QualityPreset::Fast),
            "balanced" => Ok(QualityPreset::Balanced),
            "quality" => Ok(QualityPreset::Quality),
            other => Err(format!(
                "unknown quality preset '{}' (expected fast, balanced or quality)",
                other
            )),
        }
    }
}

/// User-chosen transformation parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformSettings {
    /// Strength slider position, 0..=100 percent
    pub strength_percent: u8,
    /// Quality preset
    pub quality: QualityPreset,
}

impl Default for TransformSettings {
    fn default() -> Self {
        Self {
            strength_percent: 70,
            quality: QualityPreset::Balanced,
        }
    }
}

/// A candidate file as selected by the user
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaFile {
    file_name: String,
    content_type: String,
    data: Bytes,
}

impl MediaFile {
    /// Wrap in-memory file contents with their declared content type
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    /// Read a file from disk, inferring its content type from the extension
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();

        Ok(Self {
            content_type: utils::content_type_for_path(path).to_string(),
            file_name,
            data: Bytes::from(data),
        })
    }

    /// Original file name
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Declared content type (e.g. `image/jpeg`)
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// File contents
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Size in bytes
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// A validated upload, immutable once built
#[derive(Clone, Debug, PartialEq)]
pub struct UploadRequest {
    file: MediaFile,
    media_kind: MediaKind,
    transform_strength: f64,
    quality_preset: QualityPreset,
}

impl UploadRequest {
    /// Build a request for a file that already passed the validation gate
    pub fn new(
        file: MediaFile,
        media_kind: MediaKind,
        settings: TransformSettings,
    ) -> std::result::Result<Self, ValidationError> {
        if settings.strength_percent > 100 {
            return Err(ValidationError::StrengthOutOfRange {
                percent: settings.strength_percent,
            });
        }

        Ok(Self {
            file,
            media_kind,
            transform_strength: f64::from(settings.strength_percent) / 100.0,
            quality_preset: settings.quality,
        })
    }

    /// The file being uploaded
    pub fn file(&self) -> &MediaFile {
        &self.file
    }

    /// Image or video
    pub fn media_kind(&self) -> MediaKind {
        self.media_kind
    }

    /// Strength as a fraction in [0, 1]
    pub fn transform_strength(&self) -> f64 {
        self.transform_strength
    }

    /// Quality preset
    pub fn quality_preset(&self) -> QualityPreset {
        self.quality_preset
    }

    /// Step count derived from the quality preset
    pub fn steps(&self) -> u32 {
        self.quality_preset.steps()
    }

    /// Text fields of the multipart upload body, in send order
    pub fn form_fields(&self) -> [(&'static str, String); 2] {
        [
            ("strength", self.transform_strength.to_string()),
            ("steps", self.steps().to_string()),
        ]
    }
}

/// Processing phase reported by the service
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobPhase {
    /// Result is ready
    Completed,
    /// Processing failed
    Failed,
    /// Still queued or processing (any status the client does not know maps here)
    #[serde(other)]
    Pending,
}

impl JobPhase {
    /// Completed or Failed
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobPhase::Completed | JobPhase::Failed)
    }
}

/// One point-in-time status report for a task
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Progress percentage, 0..=100 (not guaranteed to be monotonic)
    pub progress: u8,
    /// Processing phase
    pub phase: JobPhase,
    /// Where the result can be fetched, once completed
    pub result_url: Option<String>,
    /// Whether the result is a video
    pub is_video: bool,
    /// Name of the uploaded file as recorded by the service
    pub original_filename: String,
    /// Total processing time reported on completion
    pub processing_time_seconds: Option<f64>,
    /// Error reported by the service
    pub error_message: Option<String>,
}

impl StatusSnapshot {
    /// The 0% snapshot shown as soon as a job is accepted
    pub fn initial(request: &UploadRequest) -> Self {
        Self {
            progress: 0,
            phase: JobPhase::Pending,
            result_url: None,
            is_video: request.media_kind() == MediaKind::Video,
            original_filename: request.file().file_name().to_string(),
            processing_time_seconds: None,
            error_message: None,
        }
    }

    /// Suggested file name for saving the result
    pub fn download_name(&self) -> String {
        format!("ghibli_{}", self.original_filename)
    }

    /// Processing time rounded to whole seconds, when reported and non-zero
    pub fn processing_seconds(&self) -> Option<u64> {
        self.processing_time_seconds.and_then(utils::round_seconds)
    }
}

/// Fieldless view of [`ControllerState`] for logging and events
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Waiting for a file
    Idle,
    /// Checking the file against upload policy
    Validating,
    /// Sending the file to the processing service
    Uploading,
    /// Waiting for the job to finish
    Polling,
    /// Showing a finished result
    Result,
    /// Showing a failure
    Error,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Validating => "validating",
            Phase::Uploading => "uploading",
            Phase::Polling => "polling",
            Phase::Result => "result",
            Phase::Error => "error",
        };
        f.write_str(name)
    }
}

/// The single live state of the upload lifecycle
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(tag = "phase", rename_all = "lowercase")]
pub enum ControllerState {
    /// Waiting for a file
    #[default]
    Idle,
    /// Checking the file against upload policy
    Validating {
        /// Name of the file being checked
        file_name: String,
    },
    /// Sending the file to the processing service
    Uploading {
        /// Name of the file being sent
        file_name: String,
        /// Image or video
        media_kind: MediaKind,
    },
    /// Waiting for the job to finish
    Polling {
        /// The job being observed
        task: Task,
        /// Latest status report
        snapshot: StatusSnapshot,
    },
    /// The job completed
    Result {
        /// The completing status report
        snapshot: StatusSnapshot,
    },
    /// The attempt failed
    Error {
        /// Message to show, verbatim from the failing component
        message: String,
    },
}

impl ControllerState {
    /// Fieldless phase of this state
    pub fn phase(&self) -> Phase {
        match self {
            ControllerState::Idle => Phase::Idle,
            ControllerState::Validating { .. } => Phase::Validating,
            ControllerState::Uploading { .. } => Phase::Uploading,
            ControllerState::Polling { .. } => Phase::Polling,
            ControllerState::Result { .. } => Phase::Result,
            ControllerState::Error { .. } => Phase::Error,
        }
    }

    /// Result or Error: stable until an explicit reset
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ControllerState::Result { .. } | ControllerState::Error { .. }
        )
    }
}

/// How an upload attempt ended, as seen by a caller waiting on it
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// The job completed with this final snapshot
    Completed(StatusSnapshot),
    /// The attempt failed with this message
    Failed(String),
    /// The controller was reset before the attempt finished
    Cancelled,
}

/// Event emitted by the upload controller
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// The controller moved to a different phase
    StateChanged {
        /// Previous phase
        from: Phase,
        /// New phase
        to: Phase,
    },

    /// The processing service accepted the upload
    Submitted {
        /// Task ID
        task_id: TaskId,
    },

    /// A status report arrived for the active task
    Progress {
        /// Task ID
        task_id: TaskId,
        /// Progress percentage (0 to 100)
        percent: u8,
    },

    /// The job completed
    Completed {
        /// Task ID
        task_id: TaskId,
        /// Where the result can be fetched
        #[serde(skip_serializing_if = "Option::is_none")]
        result_url: Option<String>,
    },

    /// The attempt failed
    Failed {
        /// Task ID, if the failure happened after submission
        #[serde(skip_serializing_if = "Option::is_none")]
        task_id: Option<TaskId>,
        /// Machine-readable error code
        code: String,
        /// Error message
        error: String,
    },

    /// The controller returned to idle
    Reset,
}
