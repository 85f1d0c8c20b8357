use bill_capture_core::categorization::{category_list, fallback_categories, reconcile};
use bill_capture_core::contract::{Bill, CategorizationMessage, CategorizedItem, ReceiptItem};
use serde_json::Value;
use thiserror::Error;

use crate::adapters::categorizer::ItemCategorizer;
use crate::adapters::repository::{BillRepository, CategorySource};
use crate::adapters::AdapterError;
use crate::handlers::sqs::{is_sqs_event, record_bodies, BatchOutcome};

pub struct CategorizationContext<'a> {
    pub bills: &'a dyn BillRepository,
    pub categories: &'a dyn CategorySource,
    /// `None` when no LLM API key is configured.
    pub categorizer: Option<&'a dyn ItemCategorizer>,
}

#[derive(Debug, Error)]
pub enum CategorizeError {
    #[error("invalid categorization message: {0}")]
    InvalidMessage(String),
    #[error("missing required fields: billId and userId are required")]
    MissingIdentifiers,
    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

/// Categorizes each record's items and writes the completed bill. The first
/// failing record stops the batch.
pub fn handle_categorization_event(
    event: &Value,
    context: &CategorizationContext<'_>,
    now: &str,
) -> BatchOutcome {
    if !is_sqs_event(event) {
        return BatchOutcome::failed(400, 0, 0, "Event is not an SQS batch".to_string());
    }
    let bodies = match record_bodies(event) {
        Ok(bodies) => bodies,
        Err(message) => return BatchOutcome::failed(400, 0, 0, message),
    };

    let mut processed = 0;
    for body in bodies {
        let result = serde_json::from_str::<CategorizationMessage>(body)
            .map_err(|error| CategorizeError::InvalidMessage(error.to_string()))
            .and_then(|message| categorize_receipt(message, context, now));
        if let Err(error) = result {
            tracing::error!(%error, "categorization failed");
            return BatchOutcome::failed(
                500,
                processed,
                0,
                format!("Error processing categorization: {error}"),
            );
        }
        processed += 1;
    }

    BatchOutcome::completed(processed, 0)
}

/// Merges the categorized receipt into the stored record and marks it
/// `COMPLETED`.
pub fn categorize_receipt(
    message: CategorizationMessage,
    context: &CategorizationContext<'_>,
    now: &str,
) -> Result<Bill, CategorizeError> {
    let (Some(bill_id), Some(user_id)) = (
        message.bill_id.filter(|id| !id.trim().is_empty()),
        message.user_id.filter(|id| !id.trim().is_empty()),
    ) else {
        return Err(CategorizeError::MissingIdentifiers);
    };

    let existing = match context.bills.get_bill(&bill_id) {
        Ok(existing) => existing,
        Err(error) => {
            tracing::warn!(bill_id = %bill_id, %error, "could not read existing bill; writing a fresh record");
            None
        }
    };
    let base = existing.unwrap_or_else(|| Bill {
        bill_id: bill_id.clone(),
        ..Bill::default()
    });

    let categories = category_list(context.categories.category_names().unwrap_or_else(|error| {
        tracing::warn!(%error, "could not load categories; using defaults");
        Vec::new()
    }));

    let extracted = message.extracted_data;
    let categorized = categorize_items(&bill_id, &extracted.items, &categories, context);

    let bill = base.complete(&user_id, &extracted, categorized, now);
    context.bills.put_bill(&bill)?;
    tracing::info!(
        bill_id = %bill_id,
        user_id = %user_id,
        items = bill.updated_items.len(),
        "bill categorized"
    );
    Ok(bill)
}

fn categorize_items(
    bill_id: &str,
    items: &[ReceiptItem],
    categories: &[String],
    context: &CategorizationContext<'_>,
) -> Vec<CategorizedItem> {
    if items.is_empty() {
        return Vec::new();
    }
    let Some(categorizer) = context.categorizer else {
        tracing::warn!(bill_id = %bill_id, "no categorizer configured; using default category");
        return fallback_categories(items);
    };
    match categorizer.categorize(items, categories) {
        Ok(suggestions) => reconcile(items, &suggestions, categories),
        Err(error) => {
            tracing::warn!(bill_id = %bill_id, %error, "categorizer failed; using default category");
            fallback_categories(items)
        }
    }
}

#[cfg(test)]
mod tests {
    use bill_capture_core::contract::{
        BillStatus, ExtractedReceipt, StoredUpload, DEFAULT_CATEGORY,
    };
    use serde_json::json;

    use super::*;
    use crate::test_helpers::{
        categorized, sqs_event, MemoryBillTable, ScriptedCategorizer, StaticCategories,
    };

    const NOW: &str = "2026-04-02T10:05:00.000Z";

    fn items() -> Vec<ReceiptItem> {
        vec![
            ReceiptItem {
                item_name: "MILK".to_string(),
                item_price: "4.99".to_string(),
            },
            ReceiptItem {
                item_name: "SOAP".to_string(),
                item_price: "3.00".to_string(),
            },
        ]
    }

    fn message(bill_id: Option<&str>, user_id: Option<&str>) -> CategorizationMessage {
        CategorizationMessage {
            bill_id: bill_id.map(str::to_string),
            user_id: user_id.map(str::to_string),
            extracted_data: ExtractedReceipt {
                store_name: "Corner Market".to_string(),
                total_amount: "7.99".to_string(),
                items: items(),
                ..ExtractedReceipt::default()
            },
        }
    }

    fn processing_bill() -> Bill {
        Bill::processing(StoredUpload {
            bill_id: "b1".to_string(),
            user_id: "u1".to_string(),
            s3_key: "b1-receipt.jpg".to_string(),
            file_url: "https://test-bills.s3.amazonaws.com/b1-receipt.jpg".to_string(),
            filename: "receipt.jpg".to_string(),
            file_type: "image/jpeg".to_string(),
            file_size: 10,
            upload_date: "2026-04-02T10:00:00.000Z".to_string(),
        })
    }

    #[test]
    fn merges_categories_into_existing_record() {
        let bills = MemoryBillTable::with_bills([processing_bill()]);
        let categories = StaticCategories::new(&["Dairy", "Cleaning", "Grocery"]);
        let categorizer = ScriptedCategorizer::replying(vec![
            categorized("MILK", "4.99", "dairy"),
            categorized("SOAP", "3.00", "Cleaning"),
        ]);
        let context = CategorizationContext {
            bills: &bills,
            categories: &categories,
            categorizer: Some(&categorizer),
        };

        let bill = categorize_receipt(message(Some("b1"), Some("u1")), &context, NOW)
            .expect("categorization succeeds");

        assert_eq!(bill.status, Some(BillStatus::Completed));
        assert_eq!(bill.s3_key.as_deref(), Some("b1-receipt.jpg"));
        assert_eq!(bill.upload_date.as_deref(), Some("2026-04-02T10:00:00.000Z"));
        assert_eq!(bill.store_name.as_deref(), Some("Corner Market"));
        assert_eq!(bill.updated_items[0].category, "Dairy");
        assert_eq!(bill.updated_items[1].category, "Cleaning");
        assert_eq!(bills.bill("b1"), Some(bill));

        let calls = categorizer.calls();
        assert_eq!(calls[0].1, vec!["Dairy", "Cleaning", "Grocery"]);
    }

    #[test]
    fn categorizer_failure_falls_back_to_default_category() {
        let bills = MemoryBillTable::new();
        let categories = StaticCategories::failing();
        let categorizer = ScriptedCategorizer::failing();
        let context = CategorizationContext {
            bills: &bills,
            categories: &categories,
            categorizer: Some(&categorizer),
        };

        let bill = categorize_receipt(message(Some("b9"), Some("u1")), &context, NOW)
            .expect("fallback still completes");

        assert!(bill
            .updated_items
            .iter()
            .all(|item| item.category == DEFAULT_CATEGORY));
        assert_eq!(bill.created_at.as_deref(), Some(NOW));
        // Category table failure falls back to the built-in list.
        assert!(categorizer.calls()[0].1.contains(&"Personal Care".to_string()));
    }

    #[test]
    fn missing_categorizer_uses_default_category() {
        let bills = MemoryBillTable::new();
        let categories = StaticCategories::new(&[]);
        let context = CategorizationContext {
            bills: &bills,
            categories: &categories,
            categorizer: None,
        };

        let bill = categorize_receipt(message(Some("b3"), Some("u1")), &context, NOW)
            .expect("categorization succeeds");
        assert_eq!(bill.updated_items.len(), 2);
        assert_eq!(bill.updated_items[1].category, DEFAULT_CATEGORY);
    }

    #[test]
    fn unreadable_existing_record_is_ignored() {
        let bills = MemoryBillTable::failing_reads();
        let categories = StaticCategories::new(&[]);
        let context = CategorizationContext {
            bills: &bills,
            categories: &categories,
            categorizer: None,
        };

        let bill = categorize_receipt(message(Some("b4"), Some("u1")), &context, NOW)
            .expect("read failure is not fatal");
        assert_eq!(bill.s3_key, None);
        assert_eq!(bill.bill_id, "b4");
    }

    #[test]
    fn batch_fails_when_identifiers_are_missing() {
        let bills = MemoryBillTable::new();
        let categories = StaticCategories::new(&[]);
        let context = CategorizationContext {
            bills: &bills,
            categories: &categories,
            categorizer: None,
        };

        let event = sqs_event(&[
            serde_json::to_value(message(Some("b5"), Some("u1"))).expect("serializes"),
            json!({"billId": "b6", "extractedData": {}}),
        ]);
        let outcome = handle_categorization_event(&event, &context, NOW);

        assert_eq!(outcome.status_code, 500);
        assert_eq!(outcome.processed, 1);
        assert!(outcome.message.contains("billId and userId are required"));
        assert!(bills.bill("b5").is_some());
        assert!(bills.bill("b6").is_none());
    }

    #[test]
    fn write_failure_fails_the_batch() {
        let bills = MemoryBillTable::failing_writes();
        let categories = StaticCategories::new(&[]);
        let context = CategorizationContext {
            bills: &bills,
            categories: &categories,
            categorizer: None,
        };

        let event = sqs_event(&[serde_json::to_value(message(Some("b7"), Some("u1")))
            .expect("serializes")]);
        let outcome = handle_categorization_event(&event, &context, NOW);
        assert_eq!(outcome.status_code, 500);
    }
}
