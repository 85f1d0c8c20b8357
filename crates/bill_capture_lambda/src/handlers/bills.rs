use std::time::Duration;

use bill_capture_core::contract::{Bill, BillListResponse};
use bill_capture_core::storage_keys::{decode_start_key, encode_start_key};
use serde_json::Value;

use crate::adapters::object_store::BillObjectStore;
use crate::adapters::repository::BillRepository;
use crate::handlers::http::{
    authenticated_user, is_preflight, message_response, preflight_response, query_param,
    server_error_response, success_response, ApiGatewayResponse,
};

pub const DEFAULT_PAGE_LIMIT: usize = 100;

pub struct BillListContext<'a> {
    pub bills: &'a dyn BillRepository,
    pub store: &'a dyn BillObjectStore,
    pub token_secret: Option<&'a str>,
    pub signed_url_ttl: Duration,
}

/// Lists the caller's bills newest first, each with a freshly signed URL.
pub fn handle_list_bills_event(
    event: &Value,
    context: &BillListContext<'_>,
    now_epoch_secs: i64,
) -> ApiGatewayResponse {
    if is_preflight(event) {
        return preflight_response();
    }

    let user_id = match authenticated_user(event, context.token_secret, now_epoch_secs) {
        Some(claims) => claims.user_id,
        None => match query_param(event, "userId") {
            Some(user_id) => user_id.to_string(),
            None => return message_response(401, "Unauthorized - Missing user ID"),
        },
    };

    let limit = match query_param(event, "limit").map(str::parse::<usize>) {
        None => DEFAULT_PAGE_LIMIT,
        Some(Ok(limit)) if limit > 0 => limit,
        Some(_) => return message_response(400, "limit must be a positive integer"),
    };
    let start_key = match query_param(event, "startKey").map(decode_start_key) {
        None => None,
        Some(Ok(key)) => Some(key),
        Some(Err(error)) => return message_response(400, error.message()),
    };

    let page = match context
        .bills
        .scan_bills_by_user(&user_id, limit, start_key.as_ref())
    {
        Ok(page) => page,
        Err(error) => {
            tracing::error!(user_id = %user_id, %error, "bill scan failed");
            return server_error_response("Failed to fetch bills", &error.to_string());
        }
    };

    let mut bills = page.bills;
    sort_newest_first(&mut bills);
    let entries: Vec<_> = bills
        .into_iter()
        .map(|bill| sign_file_url(bill, context.store, context.signed_url_ttl).into_list_entry())
        .collect();

    tracing::info!(user_id = %user_id, count = entries.len(), "bills listed");
    success_response(
        200,
        BillListResponse {
            count: entries.len(),
            bills: entries,
            last_evaluated_key: page.last_evaluated_key.as_ref().map(encode_start_key),
        },
    )
}

/// Orders by `uploadDate` (else `createdAt`), newest first. Records with
/// neither sort last.
pub fn sort_newest_first(bills: &mut [Bill]) {
    bills.sort_by(|a, b| b.recency_key().cmp(&a.recency_key()));
}

/// Replaces the stored URL with a time-limited signed one. On signing failure
/// the stored URL is kept.
pub fn sign_file_url(mut bill: Bill, store: &dyn BillObjectStore, ttl: Duration) -> Bill {
    let Some(key) = bill.s3_key.as_deref() else {
        return bill;
    };
    match store.presign_get(key, ttl) {
        Ok(url) => bill.file_url = Some(url),
        Err(error) => {
            tracing::warn!(bill_id = %bill.bill_id, %error, "could not sign file URL");
        }
    }
    bill
}

#[cfg(test)]
mod tests {
    use bill_capture_core::auth::{issue_token, TokenClaims};
    use bill_capture_core::contract::BillStatus;
    use bill_capture_core::storage_keys::encode_start_key;
    use serde_json::json;

    use super::*;
    use crate::adapters::repository::StartKey;
    use crate::test_helpers::{MemoryBillTable, MemoryObjectStore, TEST_SECRET};

    const NOW: i64 = 1_775_000_000;

    fn bill(id: &str, user: &str, uploaded: Option<&str>) -> Bill {
        Bill {
            bill_id: id.to_string(),
            user_id: user.to_string(),
            s3_key: Some(format!("{id}-receipt.jpg")),
            upload_date: uploaded.map(str::to_string),
            ..Bill::default()
        }
    }

    fn list(event: Value, bills: &MemoryBillTable, store: &MemoryObjectStore) -> ApiGatewayResponse {
        let context = BillListContext {
            bills,
            store,
            token_secret: Some(TEST_SECRET),
            signed_url_ttl: Duration::from_secs(3600),
        };
        handle_list_bills_event(&event, &context, NOW)
    }

    #[test]
    fn lists_owner_bills_newest_first_with_defaults() {
        let bills = MemoryBillTable::with_bills([
            bill("a", "u1", Some("2026-03-01T10:00:00.000Z")),
            bill("b", "u1", Some("2026-03-05T10:00:00.000Z")),
            bill("c", "u2", Some("2026-03-09T10:00:00.000Z")),
            Bill {
                status: Some(BillStatus::Completed),
                store_name: Some("Corner Market".to_string()),
                ..bill("d", "u1", None)
            },
        ]);
        let store = MemoryObjectStore::new();

        let response = list(json!({"queryStringParameters": {"userId": "u1"}}), &bills, &store);

        assert_eq!(response.status_code, 200);
        let body = response.json_body();
        assert_eq!(body["count"], 3);
        assert_eq!(body["lastEvaluatedKey"], Value::Null);
        let ids: Vec<&str> = body["bills"]
            .as_array()
            .expect("bills array")
            .iter()
            .map(|bill| bill["id"].as_str().expect("id"))
            .collect();
        assert_eq!(ids, vec!["b", "a", "d"]);

        let undated = &body["bills"][2];
        assert_eq!(undated["uploadDate"], "Unknown date");
        assert_eq!(undated["status"], "COMPLETED");
        assert_eq!(undated["storeName"], "Corner Market");
        let first = &body["bills"][0];
        assert_eq!(first["status"], "unknown");
        assert_eq!(first["storeName"], "Not available");
        assert_eq!(
            first["fileUrl"],
            "https://test-bills.s3.amazonaws.com/b-receipt.jpg?X-Amz-Expires=3600"
        );
    }

    #[test]
    fn token_owner_takes_precedence() {
        let bills = MemoryBillTable::with_bills([
            bill("a", "u1", None),
            bill("b", "token-user", None),
        ]);
        let store = MemoryObjectStore::new();
        let token = issue_token(
            &TokenClaims {
                user_id: "token-user".to_string(),
                email: "ada@example.com".to_string(),
                exp: NOW + 60,
            },
            TEST_SECRET,
        );

        let response = list(
            json!({
                "headers": {"Authorization": format!("Bearer {token}")},
                "queryStringParameters": {"userId": "u1"},
            }),
            &bills,
            &store,
        );
        assert_eq!(response.json_body()["bills"][0]["id"], "b");
        assert_eq!(response.json_body()["count"], 1);
    }

    #[test]
    fn missing_owner_is_unauthorized() {
        let response = list(
            json!({}),
            &MemoryBillTable::new(),
            &MemoryObjectStore::new(),
        );
        assert_eq!(response.status_code, 401);
        assert_eq!(response.json_body()["message"], "Unauthorized - Missing user ID");
    }

    #[test]
    fn pages_through_results_with_start_key() {
        let bills = MemoryBillTable::with_bills([
            bill("a", "u1", None),
            bill("b", "u1", None),
            bill("c", "u1", None),
        ]);
        let store = MemoryObjectStore::new();

        let first = list(
            json!({"queryStringParameters": {"userId": "u1", "limit": "2"}}),
            &bills,
            &store,
        )
        .json_body();
        assert_eq!(first["count"], 2);
        let expected_key = encode_start_key(&StartKey::from([(
            "billId".to_string(),
            "b".to_string(),
        )]));
        assert_eq!(first["lastEvaluatedKey"], expected_key.as_str());

        let second = list(
            json!({"queryStringParameters": {"userId": "u1", "limit": "2", "startKey": expected_key}}),
            &bills,
            &store,
        )
        .json_body();
        assert_eq!(second["count"], 1);
        assert_eq!(second["bills"][0]["id"], "c");
    }

    #[test]
    fn rejects_bad_paging_parameters() {
        let bills = MemoryBillTable::new();
        let store = MemoryObjectStore::new();
        let bad_limit = list(
            json!({"queryStringParameters": {"userId": "u1", "limit": "lots"}}),
            &bills,
            &store,
        );
        assert_eq!(bad_limit.status_code, 400);

        let bad_key = list(
            json!({"queryStringParameters": {"userId": "u1", "startKey": "%%%"}}),
            &bills,
            &store,
        );
        assert_eq!(bad_key.status_code, 400);
    }

    #[test]
    fn signing_failure_keeps_stored_url() {
        let bills = MemoryBillTable::with_bills([Bill {
            file_url: Some("https://test-bills.s3.amazonaws.com/a-receipt.jpg".to_string()),
            ..bill("a", "u1", None)
        }]);
        let store = MemoryObjectStore::failing_presign();

        let body = list(json!({"queryStringParameters": {"userId": "u1"}}), &bills, &store)
            .json_body();
        assert_eq!(
            body["bills"][0]["fileUrl"],
            "https://test-bills.s3.amazonaws.com/a-receipt.jpg"
        );
    }

    #[test]
    fn scan_failure_is_a_server_error() {
        let response = list(
            json!({"queryStringParameters": {"userId": "u1"}}),
            &MemoryBillTable::failing_reads(),
            &MemoryObjectStore::new(),
        );
        assert_eq!(response.status_code, 500);
        assert_eq!(response.json_body()["message"], "Failed to fetch bills");
    }
}
