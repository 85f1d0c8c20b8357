use super::block_on;
use crate::adapters::queue::MessagePublisher;
use crate::adapters::AdapterError;

pub struct SqsPublisher {
    queue_url: String,
    client: aws_sdk_sqs::Client,
}

impl SqsPublisher {
    pub fn new(queue_url: impl Into<String>, sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            queue_url: queue_url.into(),
            client: aws_sdk_sqs::Client::new(sdk_config),
        }
    }
}

impl MessagePublisher for SqsPublisher {
    fn publish(&self, body: &str) -> Result<(), AdapterError> {
        let request = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body);

        block_on(async move { request.send().await })
            .map(|_| ())
            .map_err(|error| AdapterError::Queue(format!("failed to enqueue message: {error}")))
    }
}
