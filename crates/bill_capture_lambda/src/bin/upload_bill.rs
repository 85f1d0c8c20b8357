use bill_capture_lambda::aws::{load_sdk_config, DynamoBillTable, S3BillStore, SqsPublisher};
use bill_capture_lambda::config::RuntimeConfig;
use bill_capture_lambda::handlers::http::ApiGatewayResponse;
use bill_capture_lambda::handlers::upload::{handle_upload_event, UploadContext};
use bill_capture_lambda::logging::init_lambda_logging;
use chrono::Utc;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

async fn handle_request(event: LambdaEvent<Value>) -> Result<ApiGatewayResponse, Error> {
    let config = RuntimeConfig::from_env()?;
    let queue_url = config.require_extraction_queue()?;

    let sdk_config = load_sdk_config().await;
    let store = S3BillStore::new(&config.bill_bucket, &sdk_config);
    let bills = DynamoBillTable::new(&config.bill_table, &sdk_config);
    let extraction_queue = SqsPublisher::new(queue_url, &sdk_config);

    let context = UploadContext {
        store: &store,
        bills: &bills,
        extraction_queue: &extraction_queue,
        token_secret: config.auth_token_secret.as_deref(),
    };
    Ok(handle_upload_event(event.payload, &context, Utc::now()))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_lambda_logging();
    lambda_runtime::run(service_fn(handle_request)).await
}
