use std::path::PathBuf;

use bill_capture_core::envelope::EnvelopeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server responded {status}: {message}")]
    Api { status: u16, message: String },
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
    #[error("{setting} is not set; pass --{flag} or set {env}")]
    MissingSetting {
        setting: &'static str,
        flag: &'static str,
        env: &'static str,
    },
    #[error("unexpected response: {0}")]
    InvalidResponse(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
