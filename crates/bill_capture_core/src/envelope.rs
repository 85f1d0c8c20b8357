//! Unwrapping of API responses as clients see them.
//!
//! Depending on how the gateway integration is configured, a function's JSON
//! payload can arrive as the response body, as a JSON string, or still wrapped
//! in the `{statusCode, headers, body}` proxy envelope.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::contract::{Bill, NOT_AVAILABLE, ZERO_AMOUNT};

const MISSING_AUTH_TOKEN: &str = "Missing Authentication Token";
const NOT_DETECTED: &str = "Not detected";
const ERROR_OCCURRED: &str = "Error occurred";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    #[error("request was rejected by the gateway: missing authentication token")]
    MissingAuthentication,
    #[error("response body is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("invalid response format: missing {0}")]
    MissingField(&'static str),
    #[error("response contains a malformed bill: {0}")]
    MalformedBill(String),
}

/// Peels string-encoded JSON and proxy `body` wrappers until the payload is
/// reached.
pub fn unwrap_response_body(raw: Value) -> Result<Value, EnvelopeError> {
    let mut current = raw;
    loop {
        current = match current {
            Value::String(text) => parse_json(&text)?,
            Value::Object(mut object) if object.get("body").is_some_and(Value::is_string) => {
                match object.remove("body") {
                    Some(Value::String(body)) => parse_json(&body)?,
                    _ => Value::Object(object),
                }
            }
            other => break check_gateway_rejection(other),
        };
    }
}

/// Parses a raw HTTP response body and unwraps it.
pub fn parse_response_text(text: &str) -> Result<Value, EnvelopeError> {
    unwrap_response_body(parse_json(text)?)
}

fn parse_json(text: &str) -> Result<Value, EnvelopeError> {
    serde_json::from_str(text).map_err(|error| EnvelopeError::InvalidJson(error.to_string()))
}

fn check_gateway_rejection(payload: Value) -> Result<Value, EnvelopeError> {
    if payload.get("message").and_then(Value::as_str) == Some(MISSING_AUTH_TOKEN) {
        return Err(EnvelopeError::MissingAuthentication);
    }
    Ok(payload)
}

/// The `bills` array of a list response.
pub fn extract_bills(payload: &Value) -> Result<Vec<Bill>, EnvelopeError> {
    let Some(entries) = payload.get("bills").and_then(Value::as_array) else {
        return Err(EnvelopeError::MissingField("bills array"));
    };
    entries.iter().cloned().map(bill_from_entry).collect()
}

/// The `data` member of a single-bill response.
pub fn extract_bill(payload: &Value) -> Result<Value, EnvelopeError> {
    payload
        .get("data")
        .filter(|data| !data.is_null())
        .cloned()
        .ok_or(EnvelopeError::MissingField("data property"))
}

/// List entries carry `id` next to `billId`; either one identifies the bill.
fn bill_from_entry(entry: Value) -> Result<Bill, EnvelopeError> {
    let mut object = match entry {
        Value::Object(object) => object,
        other => {
            return Err(EnvelopeError::MalformedBill(format!(
                "expected an object, got {other}"
            )))
        }
    };
    if !object.contains_key("billId") {
        if let Some(id) = object.get("id").cloned() {
            object.insert("billId".to_string(), id);
        }
    }
    serde_json::from_value(Value::Object(object))
        .map_err(|error| EnvelopeError::MalformedBill(error.to_string()))
}

/// Why a bill's analysis data had to be synthesized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    MissingData,
    RequestFailed,
}

/// Stand-in record shown when a bill's analysis data cannot be loaded.
pub fn fallback_bill(bill_id: &str, reason: FallbackReason) -> Bill {
    let (store_name, detail) = match reason {
        FallbackReason::MissingData => (NOT_AVAILABLE, NOT_DETECTED),
        FallbackReason::RequestFailed => (ERROR_OCCURRED, NOT_AVAILABLE),
    };
    Bill {
        bill_id: bill_id.to_string(),
        store_name: Some(store_name.to_string()),
        store_phone: Some(detail.to_string()),
        purchase_date: Some(detail.to_string()),
        total_amount: Some(ZERO_AMOUNT.to_string()),
        subtotal: Some(ZERO_AMOUNT.to_string()),
        discount: Some(ZERO_AMOUNT.to_string()),
        ..Bill::default()
    }
}

/// Full analysis data for a bill. Never fails: a response without usable
/// `data` or a failed request yields the fallback record.
pub fn extract_bill_data<E>(response: Result<Value, E>, bill_id: &str) -> Bill {
    let payload = match response {
        Ok(payload) => payload,
        Err(_) => return fallback_bill(bill_id, FallbackReason::RequestFailed),
    };
    let Ok(Value::Object(mut data)) = extract_bill(&payload) else {
        return fallback_bill(bill_id, FallbackReason::MissingData);
    };
    ensure_bill_id(&mut data, bill_id);
    serde_json::from_value(Value::Object(data))
        .unwrap_or_else(|_| fallback_bill(bill_id, FallbackReason::MissingData))
}

fn ensure_bill_id(data: &mut Map<String, Value>, bill_id: &str) {
    if !data.contains_key("billId") {
        data.insert("billId".to_string(), Value::from(bill_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unwraps_string_and_proxy_envelopes() {
        let inner = json!({"bills": [], "count": 0});
        let proxied = json!({"statusCode": 200, "body": inner.to_string()});
        let double = Value::String(proxied.to_string());

        assert_eq!(unwrap_response_body(double).expect("unwraps"), inner);
        assert_eq!(unwrap_response_body(inner.clone()).expect("unwraps"), inner);
    }

    #[test]
    fn object_body_is_left_alone() {
        let payload = json!({"body": {"already": "parsed"}});
        assert_eq!(unwrap_response_body(payload.clone()).expect("unwraps"), payload);
    }

    #[test]
    fn reports_gateway_auth_rejection() {
        assert_eq!(
            parse_response_text(r#"{"message":"Missing Authentication Token"}"#),
            Err(EnvelopeError::MissingAuthentication)
        );
        assert!(matches!(
            parse_response_text("<html>"),
            Err(EnvelopeError::InvalidJson(_))
        ));
    }

    #[test]
    fn list_requires_bills_array() {
        assert_eq!(
            extract_bills(&json!({"items": []})),
            Err(EnvelopeError::MissingField("bills array"))
        );

        let bills = extract_bills(&json!({
            "bills": [{"id": "b1", "userId": "u1", "status": "COMPLETED", "totalAmount": "4.00"}],
            "count": 1
        }))
        .expect("bills parse");
        assert_eq!(bills[0].bill_id, "b1");
        assert!(bills[0].is_completed());
    }

    #[test]
    fn single_bill_requires_data() {
        assert_eq!(
            extract_bill(&json!({"message": "ok"})),
            Err(EnvelopeError::MissingField("data property"))
        );
        assert_eq!(
            extract_bill(&json!({"data": {"billId": "b1"}})).expect("data present"),
            json!({"billId": "b1"})
        );
    }

    #[test]
    fn bill_data_falls_back_instead_of_failing() {
        let missing = extract_bill_data::<EnvelopeError>(Ok(json!({"message": "ok"})), "b1");
        assert_eq!(missing.store_name.as_deref(), Some(NOT_AVAILABLE));
        assert_eq!(missing.purchase_date.as_deref(), Some("Not detected"));

        let failed = extract_bill_data(Err(EnvelopeError::MissingAuthentication), "b1");
        assert_eq!(failed.store_name.as_deref(), Some("Error occurred"));
        assert_eq!(failed.total_amount.as_deref(), Some(ZERO_AMOUNT));
        assert_eq!(failed.bill_id, "b1");
    }

    #[test]
    fn bill_data_reads_full_record() {
        let bill = extract_bill_data::<EnvelopeError>(
            Ok(json!({"data": {"storeName": "Corner Market", "fileSize": 42}})),
            "b7",
        );
        assert_eq!(bill.bill_id, "b7");
        assert_eq!(bill.store_name.as_deref(), Some("Corner Market"));
        assert_eq!(bill.file_size, Some(42));
    }
}
