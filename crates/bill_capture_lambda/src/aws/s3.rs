use std::time::Duration;

use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use bill_capture_core::storage_keys::object_url;

use super::block_on;
use crate::adapters::object_store::BillObjectStore;
use crate::adapters::AdapterError;

pub struct S3BillStore {
    bucket: String,
    client: aws_sdk_s3::Client,
}

impl S3BillStore {
    pub fn new(bucket: impl Into<String>, sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            bucket: bucket.into(),
            client: aws_sdk_s3::Client::new(sdk_config),
        }
    }
}

impl BillObjectStore for S3BillStore {
    fn put_object(&self, key: &str, body: &[u8], content_type: &str) -> Result<(), AdapterError> {
        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body.to_vec()));

        block_on(async move { request.send().await })
            .map(|_| ())
            .map_err(|error| AdapterError::Storage(format!("failed to write {key}: {error}")))
    }

    fn object_url(&self, key: &str) -> String {
        object_url(&self.bucket, key)
    }

    fn presign_get(&self, key: &str, ttl: Duration) -> Result<String, AdapterError> {
        let presigning = PresigningConfig::expires_in(ttl)
            .map_err(|error| AdapterError::Storage(format!("invalid signing ttl: {error}")))?;
        let request = self.client.get_object().bucket(&self.bucket).key(key);

        block_on(async move { request.presigned(presigning).await })
            .map(|signed| signed.uri().to_string())
            .map_err(|error| AdapterError::Storage(format!("failed to sign {key}: {error}")))
    }
}
