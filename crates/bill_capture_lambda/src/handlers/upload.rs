use bill_capture_core::contract::{
    normalize_upload, Bill, BillStatus, ExtractionMessage, StoredUpload, UploadAccepted,
    UploadRequest, ANONYMOUS_USER,
};
use bill_capture_core::storage_keys::receipt_object_key;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::adapters::object_store::BillObjectStore;
use crate::adapters::queue::MessagePublisher;
use crate::adapters::repository::BillRepository;
use crate::adapters::AdapterError;
use crate::handlers::http::{
    authenticated_user, error_response, is_preflight, normalize_apigw_event, preflight_response,
    server_error_response, success_response, ApiGatewayResponse,
};

pub struct UploadContext<'a> {
    pub store: &'a dyn BillObjectStore,
    pub bills: &'a dyn BillRepository,
    pub extraction_queue: &'a dyn MessagePublisher,
    pub token_secret: Option<&'a str>,
}

/// Stores the uploaded receipt, records it as `PROCESSING`, and queues it for
/// extraction. Steps are not compensated: a failure after the object write
/// leaves the object (and possibly the record) behind.
pub fn handle_upload_event(
    event: Value,
    context: &UploadContext<'_>,
    now: DateTime<Utc>,
) -> ApiGatewayResponse {
    if is_preflight(&event) {
        return preflight_response();
    }

    let token_user = authenticated_user(&event, context.token_secret, now.timestamp())
        .map(|claims| claims.user_id);

    let payload = match normalize_apigw_event(event) {
        Ok(value) => value,
        Err(message) => return invalid_request(&message),
    };
    let request = match serde_json::from_value::<UploadRequest>(payload) {
        Ok(value) => value,
        Err(error) => return invalid_request(&format!("Malformed request: {error}")),
    };
    let upload = match normalize_upload(request) {
        Ok(value) => value,
        Err(error) => return invalid_request(error.message()),
    };

    let user_id = token_user
        .or_else(|| upload.user_id.clone())
        .unwrap_or_else(|| ANONYMOUS_USER.to_string());
    let bill_id = Uuid::new_v4().to_string();
    let s3_key = receipt_object_key(&bill_id, &upload.file_name);
    let upload_date = now.to_rfc3339_opts(SecondsFormat::Millis, true);

    tracing::info!(
        bill_id = %bill_id,
        user_id = %user_id,
        s3_key = %s3_key,
        file_type = %upload.file_type,
        file_size = upload.content.len(),
        "upload received"
    );

    let stored = StoredUpload {
        bill_id: bill_id.clone(),
        user_id: user_id.clone(),
        s3_key: s3_key.clone(),
        file_url: context.store.object_url(&s3_key),
        filename: upload.file_name.clone(),
        file_type: upload.file_type.clone(),
        file_size: upload.content.len() as u64,
        upload_date: upload_date.clone(),
    };

    if let Err(error) = store_and_enqueue(context, &upload.content, stored) {
        tracing::error!(bill_id = %bill_id, %error, "upload failed");
        return server_error_response("Error processing request", &error.to_string());
    }

    let accepted = UploadAccepted {
        bill_id,
        user_id,
        filename: upload.file_name,
        status: BillStatus::Processing,
        upload_date,
    };
    success_response(
        200,
        json!({
            "message": "File uploaded successfully and processing started",
            "data": accepted,
        }),
    )
}

fn store_and_enqueue(
    context: &UploadContext<'_>,
    content: &[u8],
    stored: StoredUpload,
) -> Result<(), AdapterError> {
    context
        .store
        .put_object(&stored.s3_key, content, &stored.file_type)?;

    let message = ExtractionMessage {
        bill_id: Some(stored.bill_id.clone()),
        user_id: Some(stored.user_id.clone()),
        s3_key: Some(stored.s3_key.clone()),
    };
    context.bills.put_bill(&Bill::processing(stored))?;

    let body = serde_json::to_string(&message)
        .map_err(|error| AdapterError::Queue(format!("failed to encode message: {error}")))?;
    context.extraction_queue.publish(&body)
}

fn invalid_request(message: &str) -> ApiGatewayResponse {
    error_response(400, json!({ "message": message }))
}
