//! Configuration types for ghibli-client
//!
//! Upload policy (size limit, poll cadence, quality presets) is fixed; see the
//! constants below. [`Config`] only covers how the client reaches the processing
//! service and how long it is willing to wait.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Largest file accepted for upload (100 MiB, inclusive)
pub const MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

/// Delay between the resolution of one status request and the next one
pub const POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Processing service connection settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the processing service (default: "http://localhost:5000")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Time allowed to establish a connection (default: 10 seconds, None = no limit)
    #[serde(
        default = "default_connect_timeout",
        with = "optional_duration_serde"
    )]
    pub connect_timeout: Option<Duration>,

    /// Total time allowed for a status or health request (default: 60 seconds, None = no timeout)
    #[serde(
        default = "default_request_timeout",
        with = "optional_duration_serde"
    )]
    pub request_timeout: Option<Duration>,

    /// Total time allowed for an upload, body included (default: None = no timeout)
    ///
    /// Files up to 100 MiB may take minutes on a slow link, so uploads are not
    /// bound by `request_timeout`.
    #[serde(default, with = "optional_duration_serde")]
    pub upload_timeout: Option<Duration>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            connect_timeout: default_connect_timeout(),
            request_timeout: default_request_timeout(),
            upload_timeout: None,
        }
    }
}

/// Status polling settings
///
/// The delay between status requests is always [`POLL_INTERVAL`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Fixed at [`POLL_INTERVAL`]; only crate tests shorten it
    #[serde(skip, default = "default_poll_interval")]
    pub(crate) interval: Duration,

    /// Give up after polling for this long (default: None = poll until a terminal state)
    ///
    /// Video jobs can legitimately take many minutes, so no deadline is imposed
    /// unless one is configured.
    #[serde(default, with = "optional_duration_serde")]
    pub max_duration: Option<Duration>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: default_poll_interval(),
            max_duration: None,
        }
    }
}

/// Main configuration for [`UploadController`](crate::UploadController)
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Processing service connection settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Status polling settings
    #[serde(default)]
    pub polling: PollingConfig,
}

impl Config {
    /// Build a configuration from environment variables, falling back to defaults.
    ///
    /// - `GHIBLI_API_URL` - base URL of the processing service
    /// - `GHIBLI_CONNECT_TIMEOUT_SECS` - connection timeout, `0` disables it
    /// - `GHIBLI_REQUEST_TIMEOUT_SECS` - status and health request timeout, `0` disables it
    /// - `GHIBLI_UPLOAD_TIMEOUT_SECS` - upload timeout, `0` (the default) disables it
    /// - `GHIBLI_MAX_POLL_SECS` - overall polling deadline, `0` disables it
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Config::default();

        if let Some(url) = lookup("GHIBLI_API_URL") {
            config.api.base_url = url;
        }
        if let Some(raw) = lookup("GHIBLI_CONNECT_TIMEOUT_SECS") {
            config.api.connect_timeout = parse_optional_secs("GHIBLI_CONNECT_TIMEOUT_SECS", &raw)?;
        }
        if let Some(raw) = lookup("GHIBLI_REQUEST_TIMEOUT_SECS") {
            config.api.request_timeout = parse_optional_secs("GHIBLI_REQUEST_TIMEOUT_SECS", &raw)?;
        }
        if let Some(raw) = lookup("GHIBLI_UPLOAD_TIMEOUT_SECS") {
            config.api.upload_timeout = parse_optional_secs("GHIBLI_UPLOAD_TIMEOUT_SECS", &raw)?;
        }
        if let Some(raw) = lookup("GHIBLI_MAX_POLL_SECS") {
            config.polling.max_duration = parse_optional_secs("GHIBLI_MAX_POLL_SECS", &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration can be used to build a client.
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.api.base_url).map_err(|e| Error::Config {
            message: format!("invalid base URL '{}': {}", self.api.base_url, e),
            key: Some("base_url".to_string()),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config {
                message: format!("unsupported URL scheme '{}'", url.scheme()),
                key: Some("base_url".to_string()),
            });
        }

        Ok(())
    }
}

fn parse_optional_secs(key: &str, raw: &str) -> Result<Option<Duration>> {
    let secs: u64 = raw.trim().parse().map_err(|_| Error::Config {
        message: format!("expected a whole number of seconds, got '{}'", raw),
        key: Some(key.to_string()),
    })?;
    Ok((secs > 0).then(|| Duration::from_secs(secs)))
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_connect_timeout() -> Option<Duration> {
    Some(Duration::from_secs(10))
}

fn default_request_timeout() -> Option<Duration> {
    Some(Duration::from_secs(60))
}

fn default_poll_interval() -> Duration {
    POLL_INTERVAL
}

// Optional Duration serialization helper (whole seconds)
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
