//! AWS-oriented adapters and handlers for the bill-capture functions.
//!
//! Handlers are synchronous and talk to the outside world only through the
//! traits in [`adapters`]; the binaries wire in the AWS SDK and LLM
//! implementations from [`aws`] and [`openai`].

pub mod adapters;
pub mod aws;
pub mod config;
pub mod handlers;
pub mod logging;
pub mod openai;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
