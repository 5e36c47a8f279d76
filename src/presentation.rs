//! Presentation boundary: a render-ready view of the controller state.
//!
//! The controller never renders anything itself. [`View::from_state`] derives
//! everything a renderer needs from a [`ControllerState`], and
//! [`spawn_presenter`] re-renders a [`Presenter`] on every state change.

use serde::Serialize;
use tokio::task::JoinHandle;

use crate::controller::UploadController;
use crate::types::{ControllerState, MediaKind, Phase, StatusSnapshot};

/// Result section of the view
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResultView {
    /// Absolute URL of the result when it could be resolved, otherwise the raw reference
    pub media_url: Option<String>,
    /// Whether the result is a video
    pub is_video: bool,
    /// Suggested name for saving the result
    pub download_name: String,
    /// Processing time in whole seconds, hidden when not reported or zero
    pub processing_seconds: Option<u64>,
}

/// Everything a renderer shows for one controller state
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct View {
    /// Current phase
    pub phase: Phase,
    /// Progress percentage
    pub progress: u8,
    /// "Image" or "Video" once the media kind is known
    pub media_label: Option<&'static str>,
    /// Expectation shown while the job is uploading or processing
    pub processing_message: Option<&'static str>,
    /// Present in the Result phase
    pub result: Option<ResultView>,
    /// Present in the Error phase, verbatim
    pub error: Option<String>,
}

impl View {
    /// Derive the view for a state
    ///
    /// `resolve` turns a result reference into an absolute URL; see
    /// [`UploadController::result_media_url`].
    pub fn from_state(
        state: &ControllerState,
        resolve: impl Fn(&StatusSnapshot) -> Option<String>,
    ) -> Self {
        let mut view = View {
            phase: state.phase(),
            progress: 0,
            media_label: None,
            processing_message: None,
            result: None,
            error: None,
        };

        match state {
            ControllerState::Idle | ControllerState::Validating { .. } => {}
            ControllerState::Uploading { media_kind, .. } => {
                view.media_label = Some(media_kind.label());
                view.processing_message = Some(media_kind.processing_hint());
            }
            ControllerState::Polling { snapshot, .. } => {
                let kind = kind_of(snapshot);
                view.progress = snapshot.progress;
                view.media_label = Some(kind.label());
                view.processing_message = Some(kind.processing_hint());
            }
            ControllerState::Result { snapshot } => {
                view.progress = 100;
                view.media_label = Some(kind_of(snapshot).label());
                view.result = Some(ResultView {
                    media_url: resolve(snapshot).or_else(|| snapshot.result_url.clone()),
                    is_video: snapshot.is_video,
                    download_name: snapshot.download_name(),
                    processing_seconds: snapshot.processing_seconds(),
                });
            }
            ControllerState::Error { message } => {
                view.error = Some(message.clone());
            }
        }

        view
    }
}

fn kind_of(snapshot: &StatusSnapshot) -> MediaKind {
    if snapshot.is_video {
        MediaKind::Video
    } else {
        MediaKind::Image
    }
}

/// A rendering surface driven by the controller
pub trait Presenter: Send + Sync + 'static {
    /// Draw the view; called once per state change
    fn render(&self, view: &View);
}

/// Render the current state, then re-render on every change
///
/// The task ends when every clone of the controller has been dropped.
pub fn spawn_presenter<P: Presenter>(controller: &UploadController, presenter: P) -> JoinHandle<()> {
    let mut rx = controller.watch();
    // weak so a running presenter does not keep the controller alive
    let resolver = controller.downgrade();

    tokio::spawn(async move {
        loop {
            let state = rx.borrow_and_update().clone();
            let view = View::from_state(&state, |snapshot| {
                resolver
                    .upgrade()
                    .and_then(|controller| controller.result_media_url(snapshot).ok().flatten())
                    .map(|url| url.to_string())
            });
            presenter.render(&view);

            if rx.changed().await.is_err() {
                tracing::debug!("Controller dropped, presenter stopping");
                break;
            }
        }
    })
}
