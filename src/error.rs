//! Error types for ghibli-client
//!
//! This module groups failures by the stage of the upload lifecycle they come from:
//! - [`ValidationError`] - the file was refused before any network call
//! - [`SubmissionError`] - the creation request failed or was rejected
//! - [`PollError`] - a status request failed, could not be decoded, or was rejected
//!
//! Transport and server-reported messages are displayed verbatim so the
//! presentation layer can show exactly what went wrong.

use crate::types::{Phase, TaskId};
use std::time::Duration;
use thiserror::Error;

/// Result type alias for ghibli-client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for ghibli-client
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "base_url")
        key: Option<String>,
    },

    /// The candidate file was refused by the validation gate
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Creating the processing job failed
    #[error(transparent)]
    Submission(#[from] SubmissionError),

    /// Observing the processing job failed
    #[error(transparent)]
    Poll(#[from] PollError),

    /// The processing service reported that the job itself failed
    #[error("{message}")]
    JobFailed {
        /// The task whose processing failed
        task_id: TaskId,
        /// Message reported by the service (or a generic fallback)
        message: String,
    },

    /// Another upload already owns the controller
    #[error("an upload is already in progress (controller is {phase})")]
    Busy {
        /// The phase the controller was in when the upload was refused
        phase: Phase,
    },

    /// The upload was reset before it could finish
    #[error("upload was cancelled")]
    Cancelled,

    /// I/O error (reading a file from disk)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A URL could not be parsed or joined
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Network error outside of submission and polling (client setup, health checks)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Reasons a file is refused before upload
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Declared content type is neither an image nor a video
    #[error("Please upload an image or video file (got \"{content_type}\").")]
    UnsupportedMediaType {
        /// The declared content type of the rejected file
        content_type: String,
    },

    /// File is larger than the upload limit
    #[error("File size exceeds 100MB limit ({size} bytes, limit {limit} bytes).")]
    FileTooLarge {
        /// Size of the rejected file in bytes
        size: u64,
        /// Maximum accepted size in bytes
        limit: u64,
    },

    /// Transformation strength outside 0..=100 percent
    #[error("transformation strength must be between 0 and 100 percent (got {percent})")]
    StrengthOutOfRange {
        /// The requested strength percentage
        percent: u8,
    },
}

/// Failures while creating a processing job
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// The HTTP request itself failed (network, DNS, timeout, etc.)
    #[error("{0}")]
    Transport(#[source] reqwest::Error),

    /// The service answered with an application-level `error` field
    #[error("{0}")]
    Rejected(String),

    /// The service answered with a non-success status and no usable body
    #[error("upload failed with status {status}: {body}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Raw response body for debugging
        body: String,
    },

    /// The response could not be decoded or lacked a task id
    #[error("invalid upload response: {0}")]
    Decode(String),
}

/// Failures while observing a processing job
#[derive(Debug, Error)]
pub enum PollError {
    /// The HTTP request itself failed (network, DNS, timeout, etc.)
    #[error("{0}")]
    Transport(#[source] reqwest::Error),

    /// The service answered with an application-level `error` field
    #[error("{0}")]
    Rejected(String),

    /// The service answered with a non-success status and no usable body
    #[error("status check failed with status {status}: {body}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Raw response body for debugging
        body: String,
    },

    /// The response could not be decoded
    #[error("invalid status response: {0}")]
    Decode(String),

    /// The job stayed pending for longer than the configured polling deadline
    #[error("job did not finish within {}s", .elapsed.as_secs())]
    DeadlineExceeded {
        /// How long the loop had been polling when it gave up
        elapsed: Duration,
    },
}

impl Error {
    /// Machine-readable error code for presentation and logging
    pub fn code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Validation(e) => match e {
                ValidationError::UnsupportedMediaType { .. } => "unsupported_media_type",
                ValidationError::FileTooLarge { .. } => "file_too_large",
                ValidationError::StrengthOutOfRange { .. } => "invalid_strength",
            },
            Error::Submission(e) => match e {
                SubmissionError::Transport(_) => "upload_transport_error",
                SubmissionError::Rejected(_) => "upload_rejected",
                SubmissionError::Http { .. } => "upload_http_error",
                SubmissionError::Decode(_) => "upload_decode_error",
            },
            Error::Poll(e) => match e {
                PollError::Transport(_) => "status_transport_error",
                PollError::Rejected(_) => "status_rejected",
                PollError::Http { .. } => "status_http_error",
                PollError::Decode(_) => "status_decode_error",
                PollError::DeadlineExceeded { .. } => "poll_deadline_exceeded",
            },
            Error::JobFailed { .. } => "job_failed",
            Error::Busy { .. } => "busy",
            Error::Cancelled => "cancelled",
            Error::Io(_) => "io_error",
            Error::InvalidUrl(_) => "invalid_url",
            Error::Network(_) => "network_error",
        }
    }

    /// Whether the error happened before anything was sent over the network
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Error::Config { .. }
                | Error::Validation(_)
                | Error::Busy { .. }
                | Error::Io(_)
                | Error::InvalidUrl(_)
        )
    }
}
