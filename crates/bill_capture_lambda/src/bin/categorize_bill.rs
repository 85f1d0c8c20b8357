use bill_capture_lambda::adapters::categorizer::ItemCategorizer;
use bill_capture_lambda::aws::{load_sdk_config, DynamoBillTable, DynamoCategoryTable};
use bill_capture_lambda::config::RuntimeConfig;
use bill_capture_lambda::handlers::categorize::{
    handle_categorization_event, CategorizationContext,
};
use bill_capture_lambda::handlers::sqs::BatchOutcome;
use bill_capture_lambda::logging::init_lambda_logging;
use bill_capture_lambda::openai::OpenAiCategorizer;
use chrono::{SecondsFormat, Utc};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

async fn handle_request(event: LambdaEvent<Value>) -> Result<BatchOutcome, Error> {
    let config = RuntimeConfig::from_env()?;

    let sdk_config = load_sdk_config().await;
    let bills = DynamoBillTable::new(&config.bill_table, &sdk_config);
    let categories = DynamoCategoryTable::new(&config.category_table, &sdk_config);
    let categorizer = match config.openai_api_key.as_deref() {
        Some(api_key) => Some(OpenAiCategorizer::new(
            api_key,
            &config.openai_api_url,
            &config.openai_model,
        )?),
        None => None,
    };

    let context = CategorizationContext {
        bills: &bills,
        categories: &categories,
        categorizer: categorizer
            .as_ref()
            .map(|categorizer| categorizer as &dyn ItemCategorizer),
    };
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    Ok(handle_categorization_event(&event.payload, &context, &now))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_lambda_logging();
    lambda_runtime::run(service_fn(handle_request)).await
}
