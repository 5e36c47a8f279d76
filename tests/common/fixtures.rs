//! Media files and status bodies shaped like the processing service's answers

use ghibli_client::MediaFile;
use serde_json::{Value, json};

/// A small JPEG-typed upload
pub fn jpeg(name: &str) -> MediaFile {
    MediaFile::new(name, "image/jpeg", b"not really a jpeg".to_vec())
}

/// A small MP4-typed upload
pub fn mp4(name: &str) -> MediaFile {
    MediaFile::new(name, "video/mp4", b"not really a video".to_vec())
}

/// Accepted upload
pub fn upload_accepted(task_id: &str, is_video: bool) -> Value {
    json!({
        "task_id": task_id,
        "message": "File uploaded successfully. Processing started.",
        "is_video": is_video,
    })
}

/// Job still running; the service reports `processing` while working
pub fn status_processing(progress: u32) -> Value {
    json!({
        "status": "processing",
        "progress": progress,
        "original_filename": "cat.jpg",
        "is_video": false,
    })
}

/// Job queued but not started
pub fn status_pending() -> Value {
    json!({
        "status": "pending",
        "progress": 0,
        "original_filename": "cat.jpg",
        "is_video": false,
    })
}

/// Job finished
pub fn status_completed(task_id: &str, processing_time: f64) -> Value {
    json!({
        "status": "completed",
        "progress": 100,
        "result_url": format!("/result/{task_id}_ghibli.png"),
        "original_filename": "cat.jpg",
        "is_video": false,
        "processing_time": processing_time,
    })
}

/// Job failed
pub fn status_failed(error: &str) -> Value {
    json!({
        "status": "failed",
        "progress": 40,
        "error": error,
        "original_filename": "cat.jpg",
        "is_video": false,
    })
}
