//! Shared bill-capture domain primitives.
//!
//! This crate owns the record and message contracts plus the pure logic that
//! sits between the managed services (OCR field mapping, categorization
//! fallback, auth tokens, date heuristics, analytics). It intentionally
//! excludes AWS SDK and Lambda runtime concerns.

pub mod analytics;
pub mod auth;
pub mod categorization;
pub mod contract;
pub mod dates;
pub mod envelope;
pub mod receipt;
pub mod storage_keys;
