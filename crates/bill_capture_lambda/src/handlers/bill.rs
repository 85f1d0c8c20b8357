use std::time::Duration;

use bill_capture_core::contract::GetBillRequest;
use serde_json::{json, Value};

use crate::adapters::object_store::BillObjectStore;
use crate::adapters::repository::BillRepository;
use crate::handlers::bills::sign_file_url;
use crate::handlers::http::{
    error_response, is_preflight, message_response, normalize_apigw_event, preflight_response,
    server_error_response, success_response, ApiGatewayResponse,
};

pub struct BillLookupContext<'a> {
    pub bills: &'a dyn BillRepository,
    pub store: &'a dyn BillObjectStore,
    pub signed_url_ttl: Duration,
}

/// Returns one bill: the full record for data requests, otherwise the basic
/// view.
pub fn handle_get_bill_event(event: Value, context: &BillLookupContext<'_>) -> ApiGatewayResponse {
    if is_preflight(&event) {
        return preflight_response();
    }

    let request = normalize_apigw_event(event)
        .ok()
        .and_then(|payload| serde_json::from_value::<GetBillRequest>(payload).ok())
        .unwrap_or_default();
    let Some(bill_id) = request.bill_id.filter(|id| !id.trim().is_empty()) else {
        return message_response(400, "Missing billId parameter in request body");
    };

    let bill = match context.bills.find_bill(&bill_id) {
        Ok(Some(bill)) => bill,
        Ok(None) => {
            tracing::info!(bill_id = %bill_id, "bill not found");
            return error_response(404, json!({ "message": "Bill not found", "billId": bill_id }));
        }
        Err(error) => {
            tracing::error!(bill_id = %bill_id, %error, "bill lookup failed");
            return server_error_response("Failed to retrieve bill", &error.to_string());
        }
    };

    let bill = sign_file_url(bill, context.store, context.signed_url_ttl);
    if request.is_data_request {
        success_response(200, json!({ "data": bill }))
    } else {
        success_response(200, json!({ "data": bill.basic_view() }))
    }
}
