//! End-to-end upload lifecycle against a mock processing service
//!
//! Each test starts a wiremock server that answers `POST /upload` and
//! `GET /status/{task_id}` the way the real service does.

mod common;

use common::{
    create_test_controller, jpeg, mp4, progress_seen, requests_to, status_completed,
    status_failed, status_pending, status_processing, test_config, unreachable_base_url,
    upload_accepted, wait_for_outcome,
};
use ghibli_client::{
    ControllerState, MediaFile, Outcome, Phase, QualityPreset, TransformSettings,
    UploadController, View,
};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WAIT: Duration = Duration::from_secs(15);

fn balanced(strength_percent: u8) -> TransformSettings {
    TransformSettings {
        strength_percent,
        quality: QualityPreset::Balanced,
    }
}

async fn mount_upload(server: &MockServer, task_id: &str) {
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(upload_accepted(task_id, false)))
        .mount(server)
        .await;
}

/// Mount status answers served once each, in order; the last one repeats
async fn mount_statuses(server: &MockServer, task_id: &str, bodies: Vec<serde_json::Value>) {
    let status_path = format!("/status/{task_id}");
    let last = bodies.len().saturating_sub(1);
    for (i, body) in bodies.into_iter().enumerate() {
        let mock = Mock::given(method("GET"))
            .and(path(status_path.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(body));
        let mock = if i == last { mock } else { mock.up_to_n_times(1) };
        mock.mount(server).await;
    }
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test]
async fn non_media_upload_never_reaches_the_service() {
    let server = MockServer::start().await;
    mount_upload(&server, "abc123").await;
    let controller = create_test_controller(&server.uri());

    let outcome = controller
        .run(
            MediaFile::new("report.pdf", "application/pdf", b"%PDF-1.7".to_vec()),
            balanced(70),
        )
        .await
        .unwrap();

    assert!(matches!(outcome, Outcome::Failed(ref m) if m.starts_with("Please upload an image or video file")));
    assert!(matches!(controller.state(), ControllerState::Error { .. }));
    assert!(server.received_requests().await.unwrap().is_empty());
}

// ============================================================================
// Submission and polling
// ============================================================================

#[tokio::test]
async fn upload_sends_strength_and_steps_then_polls_the_task() {
    let server = MockServer::start().await;
    mount_upload(&server, "abc123").await;
    mount_statuses(&server, "abc123", vec![status_completed("abc123", 3.0)]).await;
    let controller = create_test_controller(&server.uri());

    let photo = MediaFile::new("cat.jpg", "image/jpeg", vec![b'j'; 2 * 1024 * 1024]);
    let task = controller.submit(photo, balanced(50)).await.unwrap();
    assert_eq!(task.id.as_str(), "abc123");
    wait_for_outcome(&controller, WAIT).await;

    let requests = server.received_requests().await.unwrap();
    let upload = requests
        .iter()
        .find(|r| r.url.path() == "/upload")
        .expect("upload request");
    let body = String::from_utf8_lossy(&upload.body);
    assert!(body.contains("name=\"file\"; filename=\"cat.jpg\""));
    assert!(body.contains("name=\"strength\"\r\n\r\n0.5\r\n"));
    assert!(body.contains("name=\"steps\"\r\n\r\n20\r\n"));
    assert!(requests_to(&server, "/status/abc123").await >= 1);
}

#[tokio::test]
async fn job_progresses_to_a_result() {
    let server = MockServer::start().await;
    mount_upload(&server, "abc123").await;
    mount_statuses(
        &server,
        "abc123",
        vec![
            status_pending(),
            status_processing(30),
            status_processing(70),
            serde_json::json!({
                "status": "completed",
                "progress": 100,
                "result_url": "/r/abc123.png",
                "is_video": false,
                "original_filename": "cat.jpg",
                "processing_time": 42.3,
            }),
        ],
    )
    .await;
    let controller = create_test_controller(&server.uri());
    let mut events = controller.subscribe();

    controller.submit(jpeg("cat.jpg"), balanced(50)).await.unwrap();
    let outcome = wait_for_outcome(&controller, WAIT).await;

    let Outcome::Completed(snapshot) = outcome else {
        panic!("expected completion, got {outcome:?}");
    };
    assert_eq!(snapshot.download_name(), "ghibli_cat.jpg");
    assert_eq!(snapshot.processing_seconds(), Some(42));
    assert_eq!(progress_seen(&mut events), vec![0, 30, 70, 100]);

    let view = View::from_state(&controller.state(), |s| {
        controller
            .result_media_url(s)
            .unwrap()
            .map(|u| u.to_string())
    });
    let result = view.result.expect("result view");
    assert_eq!(
        result.media_url,
        Some(format!("{}/r/abc123.png", server.uri()))
    );
    assert_eq!(result.processing_seconds, Some(42));
    assert_eq!(view.phase, Phase::Result);
    assert_eq!(view.media_label, Some("Image"));
}

#[tokio::test]
async fn failed_job_stops_polling() {
    let server = MockServer::start().await;
    mount_upload(&server, "abc123").await;
    mount_statuses(
        &server,
        "abc123",
        vec![status_processing(10), status_failed("model timeout")],
    )
    .await;
    let controller = create_test_controller(&server.uri());

    controller.submit(jpeg("cat.jpg"), balanced(70)).await.unwrap();
    let outcome = wait_for_outcome(&controller, WAIT).await;

    assert_eq!(outcome, Outcome::Failed("model timeout".into()));
    assert_eq!(
        controller.state(),
        ControllerState::Error {
            message: "model timeout".into()
        }
    );

    let polls = requests_to(&server, "/status/abc123").await;
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(
        requests_to(&server, "/status/abc123").await,
        polls,
        "no request after the failure"
    );
    assert_eq!(polls, 2);
}

#[tokio::test]
async fn slow_upload_outlasts_the_status_request_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(upload_accepted("vid1", true))
                .set_delay(Duration::from_millis(1500)),
        )
        .mount(&server)
        .await;
    mount_statuses(&server, "vid1", vec![status_completed("vid1", 80.0)]).await;

    let mut config = test_config(&server.uri());
    config.api.request_timeout = Some(Duration::from_secs(1));
    let controller = UploadController::new(config).unwrap();

    let task = controller
        .submit(
            MediaFile::new("clip.mp4", "video/mp4", vec![0u8; 8 * 1024 * 1024]),
            balanced(70),
        )
        .await
        .unwrap();
    assert_eq!(task.id.as_str(), "vid1");
    assert!(matches!(
        wait_for_outcome(&controller, WAIT).await,
        Outcome::Completed(_)
    ));
}

#[tokio::test]
async fn unknown_task_is_reported_verbatim() {
    let server = MockServer::start().await;
    mount_upload(&server, "gone").await;
    Mock::given(method("GET"))
        .and(path("/status/gone"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(serde_json::json!({"error": "Task not found"})),
        )
        .mount(&server)
        .await;
    let controller = create_test_controller(&server.uri());

    let outcome = controller.run(jpeg("cat.jpg"), balanced(70)).await.unwrap();

    assert_eq!(outcome, Outcome::Failed("Task not found".into()));
}

#[tokio::test]
async fn server_rejection_of_the_upload_is_shown_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(serde_json::json!({"error": "File type not allowed"})),
        )
        .mount(&server)
        .await;
    let controller = create_test_controller(&server.uri());

    let outcome = controller.run(mp4("clip.mp4"), balanced(70)).await.unwrap();

    assert_eq!(outcome, Outcome::Failed("File type not allowed".into()));
    assert_eq!(requests_to(&server, "/upload").await, 1, "not retried");
}

// ============================================================================
// Network failure
// ============================================================================

#[tokio::test]
async fn transport_failure_on_upload_never_starts_polling() {
    let controller = create_test_controller(&unreachable_base_url());
    let mut events = controller.subscribe();

    let err = controller
        .submit(jpeg("cat.jpg"), balanced(70))
        .await
        .unwrap_err();

    assert_eq!(err.code(), "upload_transport_error");
    assert_eq!(
        controller.state(),
        ControllerState::Error {
            message: err.to_string()
        }
    );
    assert!(!err.to_string().is_empty());
    assert!(controller.current_task().is_none());
    assert!(!controller.is_polling());
    assert!(progress_seen(&mut events).is_empty());
}

// ============================================================================
// Reset
// ============================================================================

#[tokio::test]
async fn reset_after_result_allows_a_new_upload_immediately() {
    let server = MockServer::start().await;
    mount_upload(&server, "abc123").await;
    mount_statuses(&server, "abc123", vec![status_completed("abc123", 1.0)]).await;
    let controller = create_test_controller(&server.uri());

    let outcome = controller.run(jpeg("cat.jpg"), balanced(70)).await.unwrap();
    assert!(matches!(outcome, Outcome::Completed(_)));

    controller.reset();
    assert_eq!(controller.state(), ControllerState::Idle);
    assert!(controller.current_task().is_none());
    assert!(controller.current_file().is_none());
    assert!(!controller.is_polling());

    // the validation gate runs again straight away
    let err = controller
        .submit(
            MediaFile::new("notes.txt", "text/plain", b"hi".to_vec()),
            balanced(70),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "unsupported_media_type");
    assert_eq!(requests_to(&server, "/upload").await, 1);
}

#[tokio::test]
async fn reset_while_polling_stops_status_requests() {
    let server = MockServer::start().await;
    mount_upload(&server, "slow").await;
    mount_statuses(&server, "slow", vec![status_processing(5)]).await;
    let controller = create_test_controller(&server.uri());

    controller.submit(jpeg("cat.jpg"), balanced(70)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    controller.reset();

    // a request already in flight may still land; nothing new is issued after it
    tokio::time::sleep(Duration::from_millis(100)).await;
    let polls = requests_to(&server, "/status/slow").await;
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(requests_to(&server, "/status/slow").await, polls);
    assert_eq!(controller.state(), ControllerState::Idle);
}

// ============================================================================
// Health and deadlines
// ============================================================================

#[tokio::test]
async fn polling_deadline_ends_a_stuck_job() {
    let server = MockServer::start().await;
    mount_upload(&server, "stuck").await;
    mount_statuses(&server, "stuck", vec![status_processing(5)]).await;

    let mut config = test_config(&server.uri());
    config.polling.max_duration = Some(Duration::from_millis(200));
    let controller = UploadController::new(config).unwrap();

    let outcome = controller.run(jpeg("cat.jpg"), balanced(70)).await.unwrap();

    assert!(matches!(outcome, Outcome::Failed(ref m) if m.starts_with("job did not finish within")));
}

#[tokio::test]
async fn health_check_reports_a_running_service() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "ok"})))
        .mount(&server)
        .await;

    let api = ghibli_client::HttpProcessingApi::new(&test_config(&server.uri()).api).unwrap();
    assert!(api.health().await.unwrap());
}

// ============================================================================
// Presentation
// ============================================================================

#[derive(Clone, Default)]
struct RecordingPresenter {
    views: std::sync::Arc<std::sync::Mutex<Vec<View>>>,
}

impl ghibli_client::Presenter for RecordingPresenter {
    fn render(&self, view: &View) {
        self.views.lock().unwrap().push(view.clone());
    }
}

#[tokio::test]
async fn presenter_renders_each_phase_of_an_upload() {
    let server = MockServer::start().await;
    mount_upload(&server, "abc123").await;
    mount_statuses(
        &server,
        "abc123",
        vec![
            status_processing(30),
            status_processing(70),
            status_completed("abc123", 42.3),
        ],
    )
    .await;
    let controller = create_test_controller(&server.uri());
    let presenter = RecordingPresenter::default();
    let rendering = ghibli_client::spawn_presenter(&controller, presenter.clone());

    controller.run(jpeg("cat.jpg"), balanced(70)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let views = presenter.views.lock().unwrap().clone();
    assert!(views.iter().any(|v| v.phase == Phase::Polling
        && v.processing_message == Some("Image processing typically takes 30-60 seconds")));

    let last = views.last().expect("at least one render");
    assert_eq!(last.phase, Phase::Result);
    let result = last.result.as_ref().expect("result section");
    assert_eq!(result.download_name, "ghibli_cat.jpg");
    assert_eq!(
        result.media_url.as_deref(),
        Some(format!("{}/result/abc123_ghibli.png", server.uri()).as_str())
    );

    drop(controller);
    tokio::time::timeout(WAIT, rendering)
        .await
        .expect("presenter stops once the controller is gone")
        .unwrap();
}
