use bill_capture_core::contract::{CategorizedItem, ReceiptItem};

use super::AdapterError;

/// Suggests a category per item. Suggestions are not trusted: callers
/// reconcile them against the extracted items and the allowed categories.
pub trait ItemCategorizer {
    fn categorize(
        &self,
        items: &[ReceiptItem],
        categories: &[String],
    ) -> Result<Vec<CategorizedItem>, AdapterError>;
}
