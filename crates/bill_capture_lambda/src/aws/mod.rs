//! AWS SDK implementations of the adapter traits.
//!
//! Handlers are synchronous, so every call blocks the current worker thread
//! on the SDK future. This requires the multi-thread tokio runtime.

use std::future::Future;

pub mod dynamodb;
pub mod s3;
pub mod sqs;
pub mod textract;

pub use dynamodb::{DynamoBillTable, DynamoCategoryTable, DynamoUserTable};
pub use s3::S3BillStore;
pub use sqs::SqsPublisher;
pub use textract::TextractAnalyzer;

pub(crate) fn block_on<F: Future>(future: F) -> F::Output {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

/// Shared SDK configuration for one invocation.
pub async fn load_sdk_config() -> aws_config::SdkConfig {
    aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await
}
