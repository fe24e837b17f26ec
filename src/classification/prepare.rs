//! Turning raw uploads into transport-ready documents.

use super::types::{UNKNOWN_MEDIA_TYPE, UploadedDocument};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};

/// Guess the media type from the filename extension.
pub fn sniff_media_type(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first_raw()
        .unwrap_or(UNKNOWN_MEDIA_TYPE)
        .to_string()
}

/// Sniff the media type and base64-encode the content of one upload.
pub fn prepare_document(filename: impl Into<String>, bytes: &[u8]) -> UploadedDocument {
    let filename = filename.into();
    let media_type = sniff_media_type(&filename);
    UploadedDocument {
        encoded: BASE64.encode(bytes),
        media_type,
        filename,
    }
}

impl UploadedDocument {
    /// Build a document from content that is already base64 encoded.
    pub fn from_encoded(
        filename: impl Into<String>,
        media_type: impl Into<String>,
        encoded: impl Into<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            media_type: media_type.into(),
            encoded: encoded.into(),
        }
    }

    /// Decode the transport encoding back into raw bytes.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        BASE64.decode(&self.encoded)
    }
}
