mod support;

use bill_capture_core::contract::{BillStatus, DEFAULT_CATEGORY};
use bill_capture_core::receipt::ExpenseAnalysis;
use bill_capture_lambda::test_helpers::{categorized, ScriptedCategorizer};
use serde_json::json;
use support::{grocery_analysis, post, upload_event, with_bearer, TestBackend};

fn upload_bill_id(backend: &TestBackend, user_id: &str) -> String {
    let response = backend.upload(upload_event(Some(user_id), "receipt.jpg"));
    assert_eq!(response.status_code, 200);
    response.json_body()["data"]["billId"]
        .as_str()
        .expect("bill id")
        .to_string()
}

#[test]
fn upload_flows_through_to_a_completed_bill() {
    let backend = TestBackend::new(
        grocery_analysis(),
        Some(ScriptedCategorizer::replying(vec![
            categorized("MILK 2L", "4.99", "Dairy"),
            categorized("RYE BREAD", "3.00", "Bakery"),
        ])),
    );

    let bill_id = upload_bill_id(&backend, "user-1");
    let pending = backend.bills.bill(&bill_id).expect("pending record");
    assert_eq!(pending.status, Some(BillStatus::Processing));

    assert!(backend.run_extraction().is_success());
    assert!(backend.run_categorization().is_success());

    let bill = backend.bills.bill(&bill_id).expect("completed record");
    assert_eq!(bill.status, Some(BillStatus::Completed));
    assert_eq!(bill.user_id, "user-1");
    assert_eq!(bill.filename.as_deref(), Some("receipt.jpg"));
    assert_eq!(bill.store_name.as_deref(), Some("Corner Market"));
    assert_eq!(bill.total_amount.as_deref(), Some("$7.99"));
    assert_eq!(
        bill.payment_details.map(|details| details.card_number),
        Some("**** **** **** 4242".to_string())
    );
    let categories: Vec<&str> = bill
        .updated_items
        .iter()
        .map(|item| item.category.as_str())
        .collect();
    assert_eq!(categories, vec!["Dairy", "Bakery"]);

    let listing = backend
        .list_bills(json!({"queryStringParameters": {"userId": "user-1"}}))
        .json_body();
    assert_eq!(listing["count"], 1);
    assert_eq!(listing["bills"][0]["id"], bill_id.as_str());
    assert_eq!(listing["bills"][0]["status"], "COMPLETED");

    let detail = backend
        .get_bill(post(json!({"billId": bill_id, "isDataRequest": true})))
        .json_body();
    assert_eq!(detail["data"]["updatedItems"][1]["category"], "Bakery");
    assert!(detail["data"]["fileUrl"]
        .as_str()
        .expect("signed url")
        .contains("X-Amz-Expires=3600"));
}

#[test]
fn categorizer_outage_still_completes_with_default_category() {
    let backend = TestBackend::new(grocery_analysis(), Some(ScriptedCategorizer::failing()));

    let bill_id = upload_bill_id(&backend, "user-1");
    backend.run_extraction();
    assert!(backend.run_categorization().is_success());

    let bill = backend.bills.bill(&bill_id).expect("completed record");
    assert_eq!(bill.status, Some(BillStatus::Completed));
    assert_eq!(bill.updated_items.len(), 2);
    assert!(bill
        .updated_items
        .iter()
        .all(|item| item.category == DEFAULT_CATEGORY));
}

#[test]
fn empty_analysis_completes_with_placeholders() {
    let backend = TestBackend::new(ExpenseAnalysis::default(), None);

    let bill_id = upload_bill_id(&backend, "user-1");
    backend.run_extraction();
    backend.run_categorization();

    let basic = backend
        .get_bill(post(json!({"billId": bill_id})))
        .json_body();
    assert_eq!(basic["data"]["storeName"], "Not Found");
    assert_eq!(basic["data"]["status"], "COMPLETED");
    assert_eq!(basic["data"].get("updatedItems"), None);
}

#[test]
fn listing_is_scoped_to_the_token_owner() {
    let backend = TestBackend::new(grocery_analysis(), None);
    backend.register(json!({"email": "ada@example.com", "password": "pw", "name": "Ada"}));
    let login = backend
        .login(json!({"email": "ada@example.com", "password": "pw"}))
        .json_body();
    let token = login["token"].as_str().expect("token").to_string();
    let owner = login["user"]["userId"].as_str().expect("user id").to_string();

    let mine = backend.upload(with_bearer(upload_event(None, "mine.jpg"), &token));
    assert_eq!(mine.json_body()["data"]["userId"], owner.as_str());
    upload_bill_id(&backend, "someone-else");

    let listing = backend
        .list_bills(with_bearer(json!({"httpMethod": "GET"}), &token))
        .json_body();
    assert_eq!(listing["count"], 1);
    assert_eq!(listing["bills"][0]["filename"], "mine.jpg");

    let anonymous = backend.list_bills(json!({"httpMethod": "GET"}));
    assert_eq!(anonymous.status_code, 401);
}

#[test]
fn unknown_bill_lookup_is_not_found() {
    let backend = TestBackend::new(grocery_analysis(), None);
    let response = backend.get_bill(post(json!({"billId": "does-not-exist"})));
    assert_eq!(response.status_code, 404);
    assert_eq!(response.json_body()["billId"], "does-not-exist");
}

#[test]
fn malformed_upload_body_is_rejected() {
    let backend = TestBackend::new(grocery_analysis(), None);
    let response = backend.upload(json!({"httpMethod": "POST", "body": "{not json"}));
    assert_eq!(response.status_code, 400);
    assert!(backend.extraction_queue.messages().is_empty());
}
