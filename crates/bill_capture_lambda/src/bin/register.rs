use bill_capture_lambda::aws::{load_sdk_config, DynamoUserTable};
use bill_capture_lambda::config::RuntimeConfig;
use bill_capture_lambda::handlers::auth::{handle_register_event, RegisterContext};
use bill_capture_lambda::handlers::http::ApiGatewayResponse;
use bill_capture_lambda::logging::init_lambda_logging;
use chrono::Utc;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

async fn handle_request(event: LambdaEvent<Value>) -> Result<ApiGatewayResponse, Error> {
    let config = RuntimeConfig::from_env()?;

    let sdk_config = load_sdk_config().await;
    let users = DynamoUserTable::new(&config.users_table, &sdk_config);

    Ok(handle_register_event(
        event.payload,
        &RegisterContext { users: &users },
        Utc::now(),
    ))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_lambda_logging();
    lambda_runtime::run(service_fn(handle_request)).await
}
