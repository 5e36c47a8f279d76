//! # ghibli-client
//!
//! Client-side upload lifecycle for an asynchronous style-transfer service.
//!
//! ## Design Philosophy
//!
//! ghibli-client is designed to be:
//! - **One upload at a time** - A single controller owns the task and its poll loop
//! - **Fail visibly** - Every failure ends the attempt and is reported verbatim
//! - **Library-first** - Rendering lives behind the [`presentation`] boundary
//! - **Observable** - Consumers watch state or subscribe to events
//!
//! ## Quick Start
//!
//! ```no_run
//! use ghibli_client::{Config, MediaFile, Outcome, TransformSettings, UploadController};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let controller = UploadController::new(Config::default())?;
//!
//!     // Subscribe to events
//!     let mut events = controller.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let file = MediaFile::from_path("cat.jpg").await?;
//!     match controller.run(file, TransformSettings::default()).await? {
//!         Outcome::Completed(snapshot) => println!("saved as {}", snapshot.download_name()),
//!         Outcome::Failed(message) => eprintln!("{message}"),
//!         Outcome::Cancelled => {}
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST client for the processing service
pub mod api;
/// Configuration types
pub mod config;
/// Upload lifecycle controller (decomposed into focused submodules)
pub mod controller;
/// Error types
pub mod error;
/// Job status polling
pub mod poller;
/// View model and presenter boundary
pub mod presentation;
/// Job creation
pub mod submitter;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;
/// Upload policy checks
pub mod validation;

// Re-export commonly used types
pub use api::{HttpProcessingApi, ProcessingApi, UploadAccepted};
pub use config::{ApiConfig, Config, MAX_UPLOAD_BYTES, POLL_INTERVAL, PollingConfig};
pub use controller::{UploadController, WeakUploadController};
pub use error::{Error, PollError, Result, SubmissionError, ValidationError};
pub use poller::{PollHandle, PollListener, StatusPoller};
pub use presentation::{Presenter, ResultView, View, spawn_presenter};
pub use submitter::JobSubmitter;
pub use types::{
    ControllerState, Event, JobPhase, MediaFile, MediaKind, Outcome, Phase, QualityPreset,
    StatusSnapshot, Task, TaskId, TransformSettings, UploadRequest,
};
