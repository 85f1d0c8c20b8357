//! Mapping of expense-analysis output onto receipt fields.
//!
//! The document types mirror the shape the OCR service returns (documents with
//! typed summary fields and grouped line items) without depending on any SDK.

use serde::{Deserialize, Serialize};

use crate::contract::{ExtractedReceipt, PaymentDetails, ReceiptItem, NOT_FOUND};

const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExpenseField {
    pub field_type: Option<String>,
    pub value: Option<String>,
}

impl ExpenseField {
    pub fn new(field_type: &str, value: &str) -> Self {
        Self {
            field_type: Some(field_type.to_string()),
            value: Some(value.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExpenseLineItem {
    pub fields: Vec<ExpenseField>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExpenseDocument {
    pub summary_fields: Vec<ExpenseField>,
    pub line_items: Vec<ExpenseLineItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExpenseAnalysis {
    pub documents: Vec<ExpenseDocument>,
}

/// Summary field types the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SummaryKind {
    VendorName,
    VendorPhone,
    ReceiptDate,
    Subtotal,
    Total,
    Discount,
    AccountNumber,
    CardType,
    CardLastFour,
}

impl SummaryKind {
    fn parse(field_type: &str) -> Option<Self> {
        match field_type {
            "VENDOR_NAME" => Some(Self::VendorName),
            "VENDOR_PHONE" => Some(Self::VendorPhone),
            "INVOICE_RECEIPT_DATE" => Some(Self::ReceiptDate),
            "SUBTOTAL" => Some(Self::Subtotal),
            "TOTAL" => Some(Self::Total),
            "DISCOUNT" => Some(Self::Discount),
            "ACCOUNT_NUMBER" => Some(Self::AccountNumber),
            "PAYMENT_CARD_TYPE" => Some(Self::CardType),
            "PAYMENT_CARD_LAST_FOUR" => Some(Self::CardLastFour),
            _ => None,
        }
    }
}

/// Maps every document's summary fields and line items into one receipt.
/// Later documents overwrite earlier summary values; items accumulate.
pub fn extract_receipt_data(analysis: &ExpenseAnalysis) -> ExtractedReceipt {
    let mut receipt = ExtractedReceipt::default();

    for document in &analysis.documents {
        for field in &document.summary_fields {
            let (Some(field_type), Some(value)) = (field_value_type(field), field_value(field))
            else {
                continue;
            };
            let Some(kind) = SummaryKind::parse(field_type) else {
                continue;
            };
            let value = value.to_string();
            match kind {
                SummaryKind::VendorName => receipt.store_name = value,
                SummaryKind::VendorPhone => receipt.store_phone = value,
                SummaryKind::ReceiptDate => receipt.purchase_date = value,
                SummaryKind::Subtotal => receipt.subtotal = value,
                SummaryKind::Total => receipt.total_amount = value,
                SummaryKind::Discount => receipt.discount = value,
                SummaryKind::AccountNumber => receipt.account_number = value,
                SummaryKind::CardType => receipt.payment_details.card_type = value,
                SummaryKind::CardLastFour => {
                    receipt.payment_details.card_number = mask_card_number(&value)
                }
            }
        }

        for line_item in &document.line_items {
            receipt.items.push(extract_line_item(line_item));
        }
    }

    receipt
}

fn extract_line_item(line_item: &ExpenseLineItem) -> ReceiptItem {
    let mut item = ReceiptItem {
        item_name: UNKNOWN.to_string(),
        item_price: UNKNOWN.to_string(),
    };
    for field in &line_item.fields {
        let (Some(field_type), Some(value)) = (field_value_type(field), field_value(field)) else {
            continue;
        };
        match field_type {
            "ITEM" => item.item_name = value.to_string(),
            "PRICE" => item.item_price = value.to_string(),
            _ => {}
        }
    }
    item
}

fn field_value_type(field: &ExpenseField) -> Option<&str> {
    field.field_type.as_deref()
}

fn field_value(field: &ExpenseField) -> Option<&str> {
    field.value.as_deref().filter(|value| !value.is_empty())
}

pub fn mask_card_number(last_four: &str) -> String {
    format!("**** **** **** {}", last_four.trim())
}

/// Whether OCR produced anything beyond the defaults.
pub fn has_extracted_content(receipt: &ExtractedReceipt) -> bool {
    receipt.store_name != NOT_FOUND
        || receipt.total_amount != NOT_FOUND
        || !receipt.items.is_empty()
        || receipt.payment_details != PaymentDetails::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grocery_document() -> ExpenseDocument {
        ExpenseDocument {
            summary_fields: vec![
                ExpenseField::new("VENDOR_NAME", "Atlantic Superstore"),
                ExpenseField::new("VENDOR_PHONE", "902-555-0100"),
                ExpenseField::new("INVOICE_RECEIPT_DATE", "25/04/04"),
                ExpenseField::new("TOTAL", "$23.47"),
                ExpenseField::new("PAYMENT_CARD_LAST_FOUR", "4821"),
                ExpenseField::new("OTHER", "ignored"),
                ExpenseField {
                    field_type: Some("SUBTOTAL".to_string()),
                    value: None,
                },
            ],
            line_items: vec![
                ExpenseLineItem {
                    fields: vec![
                        ExpenseField::new("ITEM", "2% MILK 4L"),
                        ExpenseField::new("PRICE", "6.49"),
                    ],
                },
                ExpenseLineItem {
                    fields: vec![ExpenseField::new("ITEM", "BANANAS")],
                },
            ],
        }
    }

    #[test]
    fn maps_summary_fields_by_type() {
        let receipt = extract_receipt_data(&ExpenseAnalysis {
            documents: vec![grocery_document()],
        });

        assert_eq!(receipt.store_name, "Atlantic Superstore");
        assert_eq!(receipt.store_phone, "902-555-0100");
        assert_eq!(receipt.purchase_date, "25/04/04");
        assert_eq!(receipt.total_amount, "$23.47");
        assert_eq!(receipt.subtotal, NOT_FOUND);
        assert_eq!(receipt.payment_details.card_number, "**** **** **** 4821");
        assert_eq!(receipt.payment_details.card_type, NOT_FOUND);
    }

    #[test]
    fn line_items_default_missing_fields_to_unknown() {
        let receipt = extract_receipt_data(&ExpenseAnalysis {
            documents: vec![grocery_document()],
        });

        assert_eq!(receipt.items.len(), 2);
        assert_eq!(receipt.items[0].item_name, "2% MILK 4L");
        assert_eq!(receipt.items[1].item_price, "Unknown");
    }

    #[test]
    fn later_documents_overwrite_summary_and_accumulate_items() {
        let second = ExpenseDocument {
            summary_fields: vec![ExpenseField::new("VENDOR_NAME", "Second Page Store")],
            line_items: vec![ExpenseLineItem {
                fields: vec![ExpenseField::new("ITEM", "EGGS")],
            }],
        };
        let receipt = extract_receipt_data(&ExpenseAnalysis {
            documents: vec![grocery_document(), second],
        });

        assert_eq!(receipt.store_name, "Second Page Store");
        assert_eq!(receipt.items.len(), 3);
    }

    #[test]
    fn empty_analysis_yields_defaults() {
        let receipt = extract_receipt_data(&ExpenseAnalysis::default());
        assert_eq!(receipt, ExtractedReceipt::default());
        assert!(!has_extracted_content(&receipt));
    }
}
