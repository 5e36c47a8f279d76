//! Test configuration helpers for pointing a controller at a mock or live service

use std::time::Duration;
use ghibli_client::{Config, UploadController};

/// Configuration for a service at `base_url`
///
/// Polling runs at the fixed one second cadence, with a deadline so a broken
/// mock cannot hang the test.
pub fn test_config(base_url: &str) -> Config {
    let mut config = Config::default();
    config.api.base_url = base_url.to_string();
    config.api.request_timeout = Some(Duration::from_secs(5));
    config.polling.max_duration = Some(Duration::from_secs(20));
    config
}

/// Controller talking to the service at `base_url`
pub fn create_test_controller(base_url: &str) -> UploadController {
    UploadController::new(test_config(base_url)).unwrap()
}

/// Whether a live processing service is configured
///
/// Reads `GHIBLI_API_URL` from the environment or a `.env` file.
pub fn has_live_service() -> bool {
    dotenvy::dotenv().ok();
    std::env::var("GHIBLI_API_URL").is_ok()
}

/// Controller for the live service named by `GHIBLI_API_URL`
pub fn create_live_controller() -> ghibli_client::Result<UploadController> {
    dotenvy::dotenv().ok();
    UploadController::new(Config::from_env()?)
}

/// Base URL on which nothing is listening
pub fn unreachable_base_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}
