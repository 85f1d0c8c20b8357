use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const NOT_FOUND: &str = "Not Found";
pub const NOT_AVAILABLE: &str = "Not available";
pub const UNKNOWN_DATE: &str = "Unknown date";
pub const ZERO_AMOUNT: &str = "0.00";
pub const UNKNOWN_ITEM: &str = "Unknown Item";
pub const DEFAULT_CATEGORY: &str = "Grocery";
pub const UNCATEGORIZED: &str = "Uncategorized";
pub const ANONYMOUS_USER: &str = "anonymous";
pub const DEFAULT_FILE_NAME: &str = "unknown-file";
pub const DEFAULT_FILE_TYPE: &str = "application/octet-stream";
pub const DEFAULT_CATEGORIES: [&str; 9] = [
    "Grocery",
    "Dairy",
    "Bakery",
    "Meat",
    "Produce",
    "Frozen",
    "Cleaning",
    "Personal Care",
    "Other",
];

/// Processing state of a bill. Stored upper-case; read case-insensitively.
/// Values written by other tools survive a read/write cycle untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BillStatus {
    Processing,
    Completed,
    Failed,
    Other(String),
}

impl BillStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Other(value) => value,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl From<String> for BillStatus {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "PROCESSING" => Self::Processing,
            "COMPLETED" => Self::Completed,
            "FAILED" => Self::Failed,
            _ => Self::Other(value),
        }
    }
}

impl From<BillStatus> for String {
    fn from(value: BillStatus) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for BillStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentDetails {
    pub card_type: String,
    pub card_number: String,
}

impl Default for PaymentDetails {
    fn default() -> Self {
        Self {
            card_type: NOT_FOUND.to_string(),
            card_number: NOT_FOUND.to_string(),
        }
    }
}

/// A line item as read off the receipt, before categorization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptItem {
    #[serde(default, deserialize_with = "lenient_string")]
    pub item_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub item_price: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CategorizedItem {
    #[serde(default, deserialize_with = "lenient_string")]
    pub item_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub item_price: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub category: String,
}

/// Structured fields pulled out of an expense analysis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractedReceipt {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bill_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub store_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub store_phone: String,
    #[serde(deserialize_with = "lenient_string")]
    pub purchase_date: String,
    #[serde(deserialize_with = "lenient_string")]
    pub subtotal: String,
    #[serde(deserialize_with = "lenient_string")]
    pub total_amount: String,
    #[serde(deserialize_with = "lenient_string")]
    pub discount: String,
    #[serde(deserialize_with = "lenient_string")]
    pub account_number: String,
    pub payment_details: PaymentDetails,
    pub items: Vec<ReceiptItem>,
}

impl Default for ExtractedReceipt {
    fn default() -> Self {
        Self {
            bill_id: None,
            store_name: NOT_FOUND.to_string(),
            store_phone: NOT_FOUND.to_string(),
            purchase_date: NOT_FOUND.to_string(),
            subtotal: NOT_FOUND.to_string(),
            total_amount: NOT_FOUND.to_string(),
            discount: NOT_FOUND.to_string(),
            account_number: NOT_FOUND.to_string(),
            payment_details: PaymentDetails::default(),
            items: Vec::new(),
        }
    }
}

/// The stored bill record. Optional fields are filled in by later pipeline
/// stages; everything is string-typed the way the table holds it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub bill_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(default, alias = "fileName", skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<BillStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_details: Option<PaymentDetails>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<ReceiptItem>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub updated_items: Vec<CategorizedItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Upload metadata captured when the object lands in storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    pub bill_id: String,
    pub user_id: String,
    pub s3_key: String,
    pub file_url: String,
    pub filename: String,
    pub file_type: String,
    pub file_size: u64,
    pub upload_date: String,
}

impl Bill {
    pub fn processing(upload: StoredUpload) -> Self {
        Self {
            bill_id: upload.bill_id,
            user_id: upload.user_id,
            s3_key: Some(upload.s3_key),
            file_url: Some(upload.file_url),
            filename: Some(upload.filename),
            file_type: Some(upload.file_type),
            file_size: Some(upload.file_size),
            upload_date: Some(upload.upload_date),
            status: Some(BillStatus::Processing),
            ..Self::default()
        }
    }

    /// Fill the OCR and categorization results into this record and mark it
    /// completed. Upload metadata already on the record is kept.
    pub fn complete(
        mut self,
        user_id: &str,
        extracted: &ExtractedReceipt,
        categorized: Vec<CategorizedItem>,
        now: &str,
    ) -> Self {
        self.user_id = user_id.to_string();
        self.store_name = Some(or_default(&extracted.store_name, NOT_FOUND));
        self.store_phone = Some(or_default(&extracted.store_phone, NOT_FOUND));
        self.purchase_date = Some(or_default(&extracted.purchase_date, NOT_FOUND));
        self.subtotal = Some(or_default(&extracted.subtotal, ZERO_AMOUNT));
        self.total_amount = Some(or_default(&extracted.total_amount, ZERO_AMOUNT));
        self.discount = Some(or_default(&extracted.discount, ZERO_AMOUNT));
        self.account_number = Some(or_default(&extracted.account_number, NOT_FOUND));
        self.payment_details = Some(PaymentDetails {
            card_type: or_default(&extracted.payment_details.card_type, NOT_FOUND),
            card_number: or_default(&extracted.payment_details.card_number, NOT_FOUND),
        });
        self.items = extracted
            .items
            .iter()
            .map(|item| ReceiptItem {
                item_name: or_default(&item.item_name, UNKNOWN_ITEM),
                item_price: or_default(&item.item_price, ZERO_AMOUNT),
            })
            .collect();
        self.updated_items = categorized
            .into_iter()
            .map(|item| CategorizedItem {
                item_name: or_default(&item.item_name, UNKNOWN_ITEM),
                item_price: or_default(&item.item_price, ZERO_AMOUNT),
                category: or_default(&item.category, DEFAULT_CATEGORY),
            })
            .collect();
        if self.created_at.is_none() {
            self.created_at = Some(now.to_string());
        }
        self.updated_at = Some(now.to_string());
        self.status = Some(BillStatus::Completed);
        self
    }

    pub fn is_completed(&self) -> bool {
        self.status.as_ref().is_some_and(BillStatus::is_completed)
    }

    /// Date the analytics views bucket this bill under: the purchase date when
    /// OCR found one, else the upload date.
    pub fn effective_date(&self) -> Option<&str> {
        self.purchase_date
            .as_deref()
            .filter(|value| is_present(value))
            .or(self.upload_date.as_deref())
            .or(self.created_at.as_deref())
    }

    /// Timestamp used to order a user's bills newest first.
    pub fn recency_key(&self) -> Option<&str> {
        self.upload_date.as_deref().or(self.created_at.as_deref())
    }

    pub fn basic_view(&self) -> BillBasicView {
        BillBasicView {
            id: self.bill_id.clone(),
            bill_id: self.bill_id.clone(),
            user_id: self.user_id.clone(),
            filename: self
                .filename
                .clone()
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            file_url: self.file_url.clone(),
            file_type: self
                .file_type
                .clone()
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            file_size: self
                .file_size
                .map(Value::from)
                .unwrap_or_else(|| Value::from(NOT_AVAILABLE)),
            upload_date: self.created_at.clone().or_else(|| self.upload_date.clone()),
            status: self
                .status
                .as_ref()
                .map(|status| status.as_str().to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            store_name: self
                .store_name
                .clone()
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        }
    }

    pub fn into_list_entry(mut self) -> BillListEntry {
        if self.status.is_none() {
            self.status = Some(BillStatus::Other("unknown".to_string()));
        }
        if self.store_name.is_none() {
            self.store_name = Some(NOT_AVAILABLE.to_string());
        }
        self.upload_date = Some(
            self.upload_date
                .take()
                .or_else(|| self.created_at.clone())
                .unwrap_or_else(|| UNKNOWN_DATE.to_string()),
        );
        BillListEntry {
            id: self.bill_id.clone(),
            bill: self,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BillBasicView {
    pub id: String,
    pub bill_id: String,
    pub user_id: String,
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    pub file_type: String,
    pub file_size: Value,
    pub upload_date: Option<String>,
    pub status: String,
    pub store_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BillListEntry {
    pub id: String,
    #[serde(flatten)]
    pub bill: Bill,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BillListResponse {
    pub bills: Vec<BillListEntry>,
    pub count: usize,
    pub last_evaluated_key: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub file_data: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedUpload {
    pub user_id: Option<String>,
    pub file_name: String,
    pub file_type: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadAccepted {
    pub bill_id: String,
    pub user_id: String,
    pub filename: String,
    pub status: BillStatus,
    pub upload_date: String,
}

/// Queue message asking for OCR on an uploaded object.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bill_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3_key: Option<String>,
}

/// Queue message carrying OCR output to the categorization step.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CategorizationMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bill_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub extracted_data: ExtractedReceipt,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GetBillRequest {
    #[serde(default)]
    pub bill_id: Option<String>,
    #[serde(default)]
    pub is_data_request: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub fn normalize_upload(request: UploadRequest) -> Result<NormalizedUpload, ValidationError> {
    let content = request
        .file_data
        .as_deref()
        .map(decode_file_data)
        .transpose()?
        .filter(|bytes| !bytes.is_empty())
        .ok_or_else(|| ValidationError::new("Invalid file data"))?;

    let file_type = request
        .file_type
        .filter(|value| !value.trim().is_empty())
        .or_else(|| {
            request
                .file_data
                .as_deref()
                .and_then(data_url_mime)
                .map(str::to_string)
        })
        .unwrap_or_else(|| DEFAULT_FILE_TYPE.to_string());

    Ok(NormalizedUpload {
        user_id: request
            .user_id
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty()),
        file_name: request
            .file_name
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string()),
        file_type,
        content,
    })
}

/// Decodes base64 file data, accepting the `data:<mime>;base64,` prefix a
/// browser file reader produces.
fn decode_file_data(raw: &str) -> Result<Vec<u8>, ValidationError> {
    let payload = raw
        .split_once(";base64,")
        .map(|(_, rest)| rest)
        .unwrap_or(raw);
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|_| ValidationError::new("Invalid file data"))
}

fn data_url_mime(raw: &str) -> Option<&str> {
    raw.strip_prefix("data:")
        .and_then(|rest| rest.split_once(";base64,"))
        .map(|(mime, _)| mime)
        .filter(|mime| !mime.is_empty())
}

/// OCR and LLM output marks absent values with sentinels; treat those and
/// blanks as missing.
pub fn is_present(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty() && trimmed != NOT_FOUND && trimmed != "Unknown"
}

fn or_default(value: &str, default: &str) -> String {
    if value.trim().is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}

/// Accepts strings, numbers, and null for fields the table and LLM treat as
/// free-form text.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        other => other.to_string(),
    })
}
