//! Utility functions for file metadata and URL handling

use std::path::Path;
use url::Url;

/// Content type used when the extension is unknown
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Infer a content type from a file extension
///
/// Covers the image and video formats the processing service accepts. Anything
/// else maps to `application/octet-stream`, which the validation gate rejects.
///
/// # Examples
///
/// ```
/// use ghibli_client::utils::content_type_for_path;
/// use std::path::Path;
///
/// assert_eq!(content_type_for_path(Path::new("cat.JPG")), "image/jpeg");
/// assert_eq!(content_type_for_path(Path::new("clip.webm")), "video/webm");
/// assert_eq!(content_type_for_path(Path::new("notes.txt")), "application/octet-stream");
/// ```
pub fn content_type_for_path(path: &Path) -> &'static str {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return FALLBACK_CONTENT_TYPE;
    };

    match ext.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        _ => FALLBACK_CONTENT_TYPE,
    }
}

/// Round a reported duration to whole seconds
///
/// Returns `None` for zero, negative, or non-finite values so callers can hide
/// the duration entirely.
pub fn round_seconds(seconds: f64) -> Option<u64> {
    if seconds.is_finite() && seconds > 0.0 {
        Some(seconds.round() as u64)
    } else {
        None
    }
}

/// Normalize a base URL so relative joins keep its full path
pub(crate) fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Resolve a result reference against the service base URL
///
/// Absolute references are returned unchanged; root-relative ones such as
/// `/result/abc_ghibli.png` are resolved against the host of `base`.
pub fn resolve_reference(base: &Url, reference: &str) -> Result<Url, url::ParseError> {
    base.join(reference)
}
