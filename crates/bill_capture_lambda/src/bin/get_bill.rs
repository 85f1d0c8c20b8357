use bill_capture_lambda::aws::{load_sdk_config, DynamoBillTable, S3BillStore};
use bill_capture_lambda::config::RuntimeConfig;
use bill_capture_lambda::handlers::bill::{handle_get_bill_event, BillLookupContext};
use bill_capture_lambda::handlers::http::ApiGatewayResponse;
use bill_capture_lambda::logging::init_lambda_logging;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

async fn handle_request(event: LambdaEvent<Value>) -> Result<ApiGatewayResponse, Error> {
    let config = RuntimeConfig::from_env()?;

    let sdk_config = load_sdk_config().await;
    let bills = DynamoBillTable::new(&config.bill_table, &sdk_config);
    let store = S3BillStore::new(&config.bill_bucket, &sdk_config);

    let context = BillLookupContext {
        bills: &bills,
        store: &store,
        signed_url_ttl: config.signed_url_ttl,
    };
    Ok(handle_get_bill_event(event.payload, &context))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_lambda_logging();
    lambda_runtime::run(service_fn(handle_request)).await
}
