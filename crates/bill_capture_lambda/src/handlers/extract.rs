use bill_capture_core::contract::{CategorizationMessage, ExtractionMessage};
use bill_capture_core::receipt::{extract_receipt_data, has_extracted_content};
use serde_json::Value;
use thiserror::Error;

use crate::adapters::ocr::ReceiptAnalyzer;
use crate::adapters::queue::MessagePublisher;
use crate::adapters::AdapterError;
use crate::handlers::sqs::{is_sqs_event, record_bodies, BatchOutcome};

pub struct ExtractionContext<'a> {
    pub analyzer: &'a dyn ReceiptAnalyzer,
    pub categorization_queue: &'a dyn MessagePublisher,
}

#[derive(Debug, Error)]
enum ExtractionError {
    #[error("invalid extraction message: {0}")]
    InvalidMessage(String),
    #[error("record for bill {0} is missing s3Key")]
    MissingObjectKey(String),
    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

enum RecordResult {
    Processed,
    Skipped,
}

/// Runs OCR for each queued upload and forwards the fields to the
/// categorization queue. Records without a bill id are skipped; the first
/// failing record stops the batch.
pub fn handle_extraction_event(event: &Value, context: &ExtractionContext<'_>) -> BatchOutcome {
    if !is_sqs_event(event) {
        return BatchOutcome::failed(400, 0, 0, "Event is not an SQS batch".to_string());
    }
    let bodies = match record_bodies(event) {
        Ok(bodies) => bodies,
        Err(message) => return BatchOutcome::failed(400, 0, 0, message),
    };

    let (mut processed, mut skipped) = (0, 0);
    for body in bodies {
        match process_record(body, context) {
            Ok(RecordResult::Processed) => processed += 1,
            Ok(RecordResult::Skipped) => skipped += 1,
            Err(error) => {
                tracing::error!(%error, "extraction failed");
                return BatchOutcome::failed(
                    500,
                    processed,
                    skipped,
                    format!("Error processing SQS event: {error}"),
                );
            }
        }
    }

    BatchOutcome::completed(processed, skipped)
}

fn process_record(
    body: &str,
    context: &ExtractionContext<'_>,
) -> Result<RecordResult, ExtractionError> {
    let message: ExtractionMessage = serde_json::from_str(body)
        .map_err(|error| ExtractionError::InvalidMessage(error.to_string()))?;

    let Some(bill_id) = message.bill_id.filter(|id| !id.trim().is_empty()) else {
        tracing::warn!("skipping extraction record without billId");
        return Ok(RecordResult::Skipped);
    };
    let s3_key = message
        .s3_key
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| ExtractionError::MissingObjectKey(bill_id.clone()))?;

    tracing::info!(bill_id = %bill_id, s3_key = %s3_key, "analyzing receipt");
    let analysis = context.analyzer.analyze_expense(&s3_key)?;
    let mut extracted = extract_receipt_data(&analysis);
    extracted.bill_id = Some(bill_id.clone());

    if !has_extracted_content(&extracted) {
        tracing::warn!(bill_id = %bill_id, "OCR returned no recognizable fields");
    }
    tracing::info!(
        bill_id = %bill_id,
        items = extracted.items.len(),
        store_name = %extracted.store_name,
        "receipt fields extracted"
    );

    let forward = CategorizationMessage {
        bill_id: Some(bill_id),
        user_id: message.user_id,
        extracted_data: extracted,
    };
    let body = serde_json::to_string(&forward)
        .map_err(|error| AdapterError::Queue(format!("failed to encode message: {error}")))?;
    context.categorization_queue.publish(&body)?;

    Ok(RecordResult::Processed)
}

#[cfg(test)]
mod tests {
    use bill_capture_core::receipt::{ExpenseAnalysis, ExpenseDocument, ExpenseField};
    use serde_json::json;

    use super::*;
    use crate::test_helpers::{sqs_event, RecordingPublisher, StaticAnalyzer};

    fn analysis() -> ExpenseAnalysis {
        ExpenseAnalysis {
            documents: vec![ExpenseDocument {
                summary_fields: vec![
                    ExpenseField::new("VENDOR_NAME", "Corner Market"),
                    ExpenseField::new("TOTAL", "$4.99"),
                ],
                line_items: Vec::new(),
            }],
        }
    }

    #[test]
    fn forwards_extracted_fields_to_categorization() {
        let analyzer = StaticAnalyzer::new(analysis());
        let queue = RecordingPublisher::new();
        let context = ExtractionContext {
            analyzer: &analyzer,
            categorization_queue: &queue,
        };

        let outcome = handle_extraction_event(
            &sqs_event(&[json!({"billId": "b1", "userId": "u1", "s3Key": "b1-receipt.jpg"})]),
            &context,
        );

        assert_eq!(outcome, BatchOutcome::completed(1, 0));
        assert_eq!(analyzer.requested_keys(), vec!["b1-receipt.jpg".to_string()]);
        let forwarded = &queue.json_messages()[0];
        assert_eq!(forwarded["billId"], "b1");
        assert_eq!(forwarded["userId"], "u1");
        assert_eq!(forwarded["extractedData"]["storeName"], "Corner Market");
        assert_eq!(forwarded["extractedData"]["totalAmount"], "$4.99");
        assert_eq!(forwarded["extractedData"]["billId"], "b1");
    }

    #[test]
    fn skips_records_without_bill_id() {
        let analyzer = StaticAnalyzer::new(analysis());
        let queue = RecordingPublisher::new();
        let context = ExtractionContext {
            analyzer: &analyzer,
            categorization_queue: &queue,
        };

        let outcome = handle_extraction_event(
            &sqs_event(&[
                json!({"userId": "u1", "s3Key": "orphan.jpg"}),
                json!({"billId": "b2", "userId": "u1", "s3Key": "b2-receipt.jpg"}),
            ]),
            &context,
        );

        assert_eq!(outcome.processed, 1);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(analyzer.requested_keys(), vec!["b2-receipt.jpg".to_string()]);
    }

    #[test]
    fn ocr_failure_stops_the_batch() {
        let analyzer = StaticAnalyzer::failing();
        let queue = RecordingPublisher::new();
        let context = ExtractionContext {
            analyzer: &analyzer,
            categorization_queue: &queue,
        };

        let outcome = handle_extraction_event(
            &sqs_event(&[
                json!({"billId": "b1", "s3Key": "b1.jpg"}),
                json!({"billId": "b2", "s3Key": "b2.jpg"}),
            ]),
            &context,
        );

        assert_eq!(outcome.status_code, 500);
        assert_eq!(outcome.processed, 0);
        assert_eq!(analyzer.requested_keys().len(), 1);
        assert!(queue.messages().is_empty());
    }

    #[test]
    fn rejects_events_that_are_not_sqs_batches() {
        let analyzer = StaticAnalyzer::new(analysis());
        let queue = RecordingPublisher::new();
        let context = ExtractionContext {
            analyzer: &analyzer,
            categorization_queue: &queue,
        };

        let outcome = handle_extraction_event(&json!({"billId": "b1"}), &context);
        assert_eq!(outcome.status_code, 400);
        assert!(!outcome.is_success());
    }
}
