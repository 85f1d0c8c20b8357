use bill_capture_lambda::aws::{load_sdk_config, DynamoBillTable, S3BillStore};
use bill_capture_lambda::config::RuntimeConfig;
use bill_capture_lambda::handlers::bills::{handle_list_bills_event, BillListContext};
use bill_capture_lambda::handlers::http::ApiGatewayResponse;
use bill_capture_lambda::logging::init_lambda_logging;
use chrono::Utc;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

async fn handle_request(event: LambdaEvent<Value>) -> Result<ApiGatewayResponse, Error> {
    let config = RuntimeConfig::from_env()?;

    let sdk_config = load_sdk_config().await;
    let bills = DynamoBillTable::new(&config.bill_table, &sdk_config);
    let store = S3BillStore::new(&config.bill_bucket, &sdk_config);

    let context = BillListContext {
        bills: &bills,
        store: &store,
        token_secret: config.auth_token_secret.as_deref(),
        signed_url_ttl: config.signed_url_ttl,
    };
    Ok(handle_list_bills_event(&event.payload, &context, Utc::now().timestamp()))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_lambda_logging();
    lambda_runtime::run(service_fn(handle_request)).await
}
