use aws_sdk_textract::types::{Document, S3Object};
use bill_capture_core::receipt::{ExpenseAnalysis, ExpenseDocument, ExpenseField, ExpenseLineItem};

use super::block_on;
use crate::adapters::ocr::ReceiptAnalyzer;
use crate::adapters::AdapterError;

/// Runs expense analysis on receipts already stored in the bill bucket.
pub struct TextractAnalyzer {
    bucket: String,
    client: aws_sdk_textract::Client,
}

impl TextractAnalyzer {
    pub fn new(bucket: impl Into<String>, sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            bucket: bucket.into(),
            client: aws_sdk_textract::Client::new(sdk_config),
        }
    }
}

impl ReceiptAnalyzer for TextractAnalyzer {
    fn analyze_expense(&self, s3_key: &str) -> Result<ExpenseAnalysis, AdapterError> {
        let document = Document::builder()
            .s3_object(
                S3Object::builder()
                    .bucket(&self.bucket)
                    .name(s3_key)
                    .build(),
            )
            .build();
        let request = self.client.analyze_expense().document(document);

        let output = block_on(async move { request.send().await })
            .map_err(|error| AdapterError::Ocr(format!("failed to analyze {s3_key}: {error}")))?;

        Ok(ExpenseAnalysis {
            documents: output
                .expense_documents()
                .iter()
                .map(convert_document)
                .collect(),
        })
    }
}

fn convert_document(document: &aws_sdk_textract::types::ExpenseDocument) -> ExpenseDocument {
    ExpenseDocument {
        summary_fields: document.summary_fields().iter().map(convert_field).collect(),
        line_items: document
            .line_item_groups()
            .iter()
            .flat_map(|group| group.line_items())
            .map(|line| ExpenseLineItem {
                fields: line
                    .line_item_expense_fields()
                    .iter()
                    .map(convert_field)
                    .collect(),
            })
            .collect(),
    }
}

fn convert_field(field: &aws_sdk_textract::types::ExpenseField) -> ExpenseField {
    ExpenseField {
        field_type: field
            .r#type()
            .and_then(|kind| kind.text())
            .map(str::to_string),
        value: field
            .value_detection()
            .and_then(|detection| detection.text())
            .map(str::to_string),
    }
}
