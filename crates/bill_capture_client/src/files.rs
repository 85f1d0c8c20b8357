use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bill_capture_core::contract::{UploadRequest, DEFAULT_FILE_NAME, DEFAULT_FILE_TYPE};

use crate::error::ClientError;

/// MIME type from the file extension, case-insensitively.
pub fn guess_mime_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        Some("tif" | "tiff") => "image/tiff",
        Some("pdf") => "application/pdf",
        _ => DEFAULT_FILE_TYPE,
    }
}

/// Reads a receipt from disk into an upload request body.
pub fn read_upload(path: &Path, user_id: Option<&str>) -> Result<UploadRequest, ClientError> {
    let content = std::fs::read(path).map_err(|source| ClientError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(DEFAULT_FILE_NAME);

    Ok(UploadRequest {
        user_id: user_id.map(str::to_string),
        file_name: Some(file_name.to_string()),
        file_type: Some(guess_mime_type(path).to_string()),
        file_data: Some(STANDARD.encode(content)),
    })
}
