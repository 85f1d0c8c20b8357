#![allow(dead_code)]

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bill_capture_core::receipt::{ExpenseAnalysis, ExpenseDocument, ExpenseField, ExpenseLineItem};
use bill_capture_lambda::adapters::categorizer::ItemCategorizer;
use bill_capture_lambda::handlers::auth::{
    handle_login_event, handle_register_event, LoginContext, RegisterContext,
};
use bill_capture_lambda::handlers::bill::{handle_get_bill_event, BillLookupContext};
use bill_capture_lambda::handlers::bills::{handle_list_bills_event, BillListContext};
use bill_capture_lambda::handlers::categorize::{
    handle_categorization_event, CategorizationContext,
};
use bill_capture_lambda::handlers::extract::{handle_extraction_event, ExtractionContext};
use bill_capture_lambda::handlers::http::ApiGatewayResponse;
use bill_capture_lambda::handlers::sqs::BatchOutcome;
use bill_capture_lambda::handlers::upload::{handle_upload_event, UploadContext};
use bill_capture_lambda::test_helpers::{
    sqs_event, MemoryBillTable, MemoryObjectStore, MemoryUserTable, RecordingPublisher,
    ScriptedCategorizer, StaticAnalyzer, StaticCategories, TEST_SECRET,
};
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};

pub const SIGNED_URL_TTL: Duration = Duration::from_secs(3600);

/// Every adapter the functions share, backed by in-memory fakes.
pub struct TestBackend {
    pub store: MemoryObjectStore,
    pub bills: MemoryBillTable,
    pub users: MemoryUserTable,
    pub extraction_queue: RecordingPublisher,
    pub categorization_queue: RecordingPublisher,
    pub analyzer: StaticAnalyzer,
    pub categories: StaticCategories,
    pub categorizer: Option<ScriptedCategorizer>,
}

impl TestBackend {
    pub fn new(analysis: ExpenseAnalysis, categorizer: Option<ScriptedCategorizer>) -> Self {
        Self {
            store: MemoryObjectStore::new(),
            bills: MemoryBillTable::new(),
            users: MemoryUserTable::new(),
            extraction_queue: RecordingPublisher::new(),
            categorization_queue: RecordingPublisher::new(),
            analyzer: StaticAnalyzer::new(analysis),
            categories: StaticCategories::new(&["Dairy", "Bakery", "Cleaning", "Grocery"]),
            categorizer,
        }
    }

    pub fn upload(&self, event: Value) -> ApiGatewayResponse {
        let context = UploadContext {
            store: &self.store,
            bills: &self.bills,
            extraction_queue: &self.extraction_queue,
            token_secret: Some(TEST_SECRET),
        };
        handle_upload_event(event, &context, Utc::now())
    }

    /// Feeds every queued extraction message through the extraction function.
    pub fn run_extraction(&self) -> BatchOutcome {
        let context = ExtractionContext {
            analyzer: &self.analyzer,
            categorization_queue: &self.categorization_queue,
        };
        handle_extraction_event(&sqs_event(&self.extraction_queue.json_messages()), &context)
    }

    pub fn run_categorization(&self) -> BatchOutcome {
        let context = CategorizationContext {
            bills: &self.bills,
            categories: &self.categories,
            categorizer: self
                .categorizer
                .as_ref()
                .map(|categorizer| categorizer as &dyn ItemCategorizer),
        };
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        handle_categorization_event(
            &sqs_event(&self.categorization_queue.json_messages()),
            &context,
            &now,
        )
    }

    pub fn list_bills(&self, event: Value) -> ApiGatewayResponse {
        let context = BillListContext {
            bills: &self.bills,
            store: &self.store,
            token_secret: Some(TEST_SECRET),
            signed_url_ttl: SIGNED_URL_TTL,
        };
        handle_list_bills_event(&event, &context, Utc::now().timestamp())
    }

    pub fn get_bill(&self, event: Value) -> ApiGatewayResponse {
        let context = BillLookupContext {
            bills: &self.bills,
            store: &self.store,
            signed_url_ttl: SIGNED_URL_TTL,
        };
        handle_get_bill_event(event, &context)
    }

    pub fn register(&self, body: Value) -> ApiGatewayResponse {
        handle_register_event(
            post(body),
            &RegisterContext { users: &self.users },
            Utc::now(),
        )
    }

    pub fn login(&self, body: Value) -> ApiGatewayResponse {
        let context = LoginContext {
            users: &self.users,
            token_secret: TEST_SECRET,
        };
        handle_login_event(post(body), &context, Utc::now())
    }
}

/// API Gateway proxy event with a JSON string body.
pub fn post(body: Value) -> Value {
    json!({"httpMethod": "POST", "body": body.to_string()})
}

pub fn upload_event(user_id: Option<&str>, file_name: &str) -> Value {
    post(json!({
        "userId": user_id,
        "fileName": file_name,
        "fileType": "image/jpeg",
        "fileData": format!("data:image/jpeg;base64,{}", STANDARD.encode(b"receipt-bytes")),
    }))
}

pub fn with_bearer(mut event: Value, token: &str) -> Value {
    event["headers"] = json!({"Authorization": format!("Bearer {token}")});
    event
}

/// A grocery receipt with two line items.
pub fn grocery_analysis() -> ExpenseAnalysis {
    ExpenseAnalysis {
        documents: vec![ExpenseDocument {
            summary_fields: vec![
                ExpenseField::new("VENDOR_NAME", "Corner Market"),
                ExpenseField::new("VENDOR_PHONE", "555-0100"),
                ExpenseField::new("INVOICE_RECEIPT_DATE", "04/02/2026"),
                ExpenseField::new("SUBTOTAL", "7.99"),
                ExpenseField::new("TOTAL", "$7.99"),
                ExpenseField::new("PAYMENT_CARD_LAST_FOUR", "4242"),
            ],
            line_items: vec![line_item("MILK 2L", "4.99"), line_item("RYE BREAD", "3.00")],
        }],
    }
}

fn line_item(name: &str, price: &str) -> ExpenseLineItem {
    ExpenseLineItem {
        fields: vec![ExpenseField::new("ITEM", name), ExpenseField::new("PRICE", price)],
    }
}
