use bill_capture_core::receipt::ExpenseAnalysis;

use super::AdapterError;

pub trait ReceiptAnalyzer {
    fn analyze_expense(&self, s3_key: &str) -> Result<ExpenseAnalysis, AdapterError>;
}
