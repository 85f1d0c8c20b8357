use bill_capture_lambda::aws::{load_sdk_config, SqsPublisher, TextractAnalyzer};
use bill_capture_lambda::config::RuntimeConfig;
use bill_capture_lambda::handlers::extract::{handle_extraction_event, ExtractionContext};
use bill_capture_lambda::handlers::sqs::BatchOutcome;
use bill_capture_lambda::logging::init_lambda_logging;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

async fn handle_request(event: LambdaEvent<Value>) -> Result<BatchOutcome, Error> {
    let config = RuntimeConfig::from_env()?;
    let queue_url = config.require_categorization_queue()?;

    let sdk_config = load_sdk_config().await;
    let analyzer = TextractAnalyzer::new(&config.bill_bucket, &sdk_config);
    let categorization_queue = SqsPublisher::new(queue_url, &sdk_config);

    let context = ExtractionContext {
        analyzer: &analyzer,
        categorization_queue: &categorization_queue,
    };
    Ok(handle_extraction_event(&event.payload, &context))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_lambda_logging();
    lambda_runtime::run(service_fn(handle_request)).await
}
