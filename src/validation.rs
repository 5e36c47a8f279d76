//! Upload policy checks performed before any network call.

use crate::config::MAX_UPLOAD_BYTES;
use crate::error::ValidationError;
use crate::types::{MediaFile, MediaKind};

/// Check a candidate file against the upload policy.
///
/// Accepts `image/*` and `video/*` content types up to and including
/// [`MAX_UPLOAD_BYTES`]. Returns the detected media kind on success.
///
/// # Examples
///
/// ```
/// use ghibli_client::validation::validate;
/// use ghibli_client::{MediaFile, MediaKind};
///
/// let photo = MediaFile::new("cat.jpg", "image/jpeg", vec![0u8; 1024]);
/// assert_eq!(validate(&photo).unwrap(), MediaKind::Image);
///
/// let notes = MediaFile::new("notes.txt", "text/plain", vec![0u8; 16]);
/// assert!(validate(&notes).is_err());
/// ```
pub fn validate(file: &MediaFile) -> Result<MediaKind, ValidationError> {
    let kind = MediaKind::from_content_type(file.content_type()).ok_or_else(|| {
        ValidationError::UnsupportedMediaType {
            content_type: file.content_type().to_string(),
        }
    })?;

    if file.size() > MAX_UPLOAD_BYTES {
        return Err(ValidationError::FileTooLarge {
            size: file.size(),
            limit: MAX_UPLOAD_BYTES,
        });
    }

    Ok(kind)
}
