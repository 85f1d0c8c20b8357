//! REST client for the bill-capture HTTP functions, plus the helpers the
//! `billctl` binary uses to read uploads and render spending reports.

pub mod api;
pub mod error;
pub mod files;
pub mod logging;
pub mod report;

pub use api::{ApiClient, LoginSession};
pub use error::ClientError;
