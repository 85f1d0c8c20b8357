//! In-memory adapter fakes for handler tests.
//!
//! Every fake records what it was asked to do and can be switched into a
//! failing mode to exercise the error paths.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use bill_capture_core::auth::UserRecord;
use bill_capture_core::contract::{Bill, CategorizedItem, ReceiptItem};
use bill_capture_core::receipt::ExpenseAnalysis;
use bill_capture_core::storage_keys::object_url;
use serde_json::Value;

use crate::adapters::categorizer::ItemCategorizer;
use crate::adapters::object_store::BillObjectStore;
use crate::adapters::ocr::ReceiptAnalyzer;
use crate::adapters::queue::MessagePublisher;
use crate::adapters::repository::{
    BillPage, BillRepository, CategorySource, StartKey, UserRepository,
};
use crate::adapters::AdapterError;

pub const TEST_BUCKET: &str = "test-bills";
pub const TEST_SECRET: &str = "test-token-secret";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
}

#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    fail_puts: bool,
    fail_presign: bool,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_puts() -> Self {
        Self {
            fail_puts: true,
            ..Self::default()
        }
    }

    pub fn failing_presign() -> Self {
        Self {
            fail_presign: true,
            ..Self::default()
        }
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().expect("poisoned mutex").get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .expect("poisoned mutex")
            .keys()
            .cloned()
            .collect()
    }
}

impl BillObjectStore for MemoryObjectStore {
    fn put_object(&self, key: &str, body: &[u8], content_type: &str) -> Result<(), AdapterError> {
        if self.fail_puts {
            return Err(AdapterError::Storage("bucket unavailable".to_string()));
        }
        self.objects.lock().expect("poisoned mutex").insert(
            key.to_string(),
            StoredObject {
                body: body.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    fn object_url(&self, key: &str) -> String {
        object_url(TEST_BUCKET, key)
    }

    fn presign_get(&self, key: &str, ttl: Duration) -> Result<String, AdapterError> {
        if self.fail_presign {
            return Err(AdapterError::Storage("signing unavailable".to_string()));
        }
        Ok(format!(
            "{}?X-Amz-Expires={}",
            object_url(TEST_BUCKET, key),
            ttl.as_secs()
        ))
    }
}

#[derive(Default)]
pub struct RecordingPublisher {
    messages: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().expect("poisoned mutex").clone()
    }

    pub fn json_messages(&self) -> Vec<Value> {
        self.messages()
            .iter()
            .map(|body| serde_json::from_str(body).expect("published message should be JSON"))
            .collect()
    }
}

impl MessagePublisher for RecordingPublisher {
    fn publish(&self, body: &str) -> Result<(), AdapterError> {
        if self.fail {
            return Err(AdapterError::Queue("queue unavailable".to_string()));
        }
        self.messages
            .lock()
            .expect("poisoned mutex")
            .push(body.to_string());
        Ok(())
    }
}

/// Returns the same analysis for every object.
#[derive(Default)]
pub struct StaticAnalyzer {
    analysis: ExpenseAnalysis,
    fail: bool,
    requested_keys: Mutex<Vec<String>>,
}

impl StaticAnalyzer {
    pub fn new(analysis: ExpenseAnalysis) -> Self {
        Self {
            analysis,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn requested_keys(&self) -> Vec<String> {
        self.requested_keys.lock().expect("poisoned mutex").clone()
    }
}

impl ReceiptAnalyzer for StaticAnalyzer {
    fn analyze_expense(&self, s3_key: &str) -> Result<ExpenseAnalysis, AdapterError> {
        self.requested_keys
            .lock()
            .expect("poisoned mutex")
            .push(s3_key.to_string());
        if self.fail {
            return Err(AdapterError::Ocr("document could not be analyzed".to_string()));
        }
        Ok(self.analysis.clone())
    }
}

/// Bills keyed by id; scans walk them in id order.
#[derive(Default)]
pub struct MemoryBillTable {
    bills: Mutex<BTreeMap<String, Bill>>,
    fail_reads: bool,
    fail_writes: bool,
}

impl MemoryBillTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bills(bills: impl IntoIterator<Item = Bill>) -> Self {
        let table = Self::new();
        for bill in bills {
            table.insert(bill);
        }
        table
    }

    pub fn failing_reads() -> Self {
        Self {
            fail_reads: true,
            ..Self::default()
        }
    }

    pub fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn insert(&self, bill: Bill) {
        self.bills
            .lock()
            .expect("poisoned mutex")
            .insert(bill.bill_id.clone(), bill);
    }

    pub fn bill(&self, bill_id: &str) -> Option<Bill> {
        self.bills.lock().expect("poisoned mutex").get(bill_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.bills.lock().expect("poisoned mutex").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_reads(&self) -> Result<(), AdapterError> {
        if self.fail_reads {
            return Err(AdapterError::Database("table unavailable".to_string()));
        }
        Ok(())
    }
}

impl BillRepository for MemoryBillTable {
    fn put_bill(&self, bill: &Bill) -> Result<(), AdapterError> {
        if self.fail_writes {
            return Err(AdapterError::Database("table is read-only".to_string()));
        }
        self.insert(bill.clone());
        Ok(())
    }

    fn get_bill(&self, bill_id: &str) -> Result<Option<Bill>, AdapterError> {
        self.check_reads()?;
        Ok(self.bill(bill_id))
    }

    fn scan_bills_by_user(
        &self,
        user_id: &str,
        limit: usize,
        start_key: Option<&StartKey>,
    ) -> Result<BillPage, AdapterError> {
        self.check_reads()?;
        let after = start_key.and_then(|key| key.get("billId")).cloned();
        let bills = self.bills.lock().expect("poisoned mutex");
        let mut matching = bills
            .values()
            .filter(|bill| after.as_ref().map_or(true, |after| &bill.bill_id > after))
            .filter(|bill| bill.user_id == user_id);

        let page: Vec<Bill> = matching.by_ref().take(limit).cloned().collect();
        let last_evaluated_key = match (matching.next(), page.last()) {
            (Some(_), Some(last)) => Some(StartKey::from([(
                "billId".to_string(),
                last.bill_id.clone(),
            )])),
            _ => None,
        };
        Ok(BillPage {
            bills: page,
            last_evaluated_key,
        })
    }

    fn find_bill(&self, bill_id: &str) -> Result<Option<Bill>, AdapterError> {
        self.check_reads()?;
        Ok(self.bill(bill_id))
    }
}

#[derive(Default)]
pub struct MemoryUserTable {
    users: Mutex<Vec<UserRecord>>,
    fail: bool,
}

impl MemoryUserTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn users(&self) -> Vec<UserRecord> {
        self.users.lock().expect("poisoned mutex").clone()
    }

    fn check(&self) -> Result<(), AdapterError> {
        if self.fail {
            return Err(AdapterError::Database("users table unavailable".to_string()));
        }
        Ok(())
    }
}

impl UserRepository for MemoryUserTable {
    fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AdapterError> {
        self.check()?;
        Ok(self
            .users
            .lock()
            .expect("poisoned mutex")
            .iter()
            .find(|user| user.email == email)
            .cloned())
    }

    fn insert_user(&self, user: &UserRecord) -> Result<(), AdapterError> {
        self.check()?;
        self.users
            .lock()
            .expect("poisoned mutex")
            .push(user.clone());
        Ok(())
    }

    fn record_login(&self, user_id: &str, at: &str) -> Result<(), AdapterError> {
        self.check()?;
        let mut users = self.users.lock().expect("poisoned mutex");
        if let Some(user) = users.iter_mut().find(|user| user.user_id == user_id) {
            user.last_login = Some(at.to_string());
            user.updated_at = at.to_string();
        }
        Ok(())
    }
}

pub struct StaticCategories {
    names: Result<Vec<String>, AdapterError>,
}

impl StaticCategories {
    pub fn new(names: &[&str]) -> Self {
        Self {
            names: Ok(names.iter().map(|name| name.to_string()).collect()),
        }
    }

    pub fn failing() -> Self {
        Self {
            names: Err(AdapterError::Database("category table unavailable".to_string())),
        }
    }
}

impl CategorySource for StaticCategories {
    fn category_names(&self) -> Result<Vec<String>, AdapterError> {
        self.names.clone()
    }
}

/// Replies with a fixed suggestion list and records the prompts' inputs.
pub struct ScriptedCategorizer {
    reply: Result<Vec<CategorizedItem>, AdapterError>,
    calls: Mutex<Vec<(Vec<ReceiptItem>, Vec<String>)>>,
}

impl ScriptedCategorizer {
    pub fn replying(suggestions: Vec<CategorizedItem>) -> Self {
        Self {
            reply: Ok(suggestions),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: Err(AdapterError::Categorizer("model unavailable".to_string())),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(Vec<ReceiptItem>, Vec<String>)> {
        self.calls.lock().expect("poisoned mutex").clone()
    }
}

impl ItemCategorizer for ScriptedCategorizer {
    fn categorize(
        &self,
        items: &[ReceiptItem],
        categories: &[String],
    ) -> Result<Vec<CategorizedItem>, AdapterError> {
        self.calls
            .lock()
            .expect("poisoned mutex")
            .push((items.to_vec(), categories.to_vec()));
        self.reply.clone()
    }
}

pub fn categorized(name: &str, price: &str, category: &str) -> CategorizedItem {
    CategorizedItem {
        item_name: name.to_string(),
        item_price: price.to_string(),
        category: category.to_string(),
    }
}

/// Wraps message bodies in an SQS trigger event.
pub fn sqs_event(bodies: &[Value]) -> Value {
    let records: Vec<Value> = bodies
        .iter()
        .enumerate()
        .map(|(index, body)| {
            serde_json::json!({
                "messageId": format!("message-{index}"),
                "eventSource": "aws:sqs",
                "body": body.to_string(),
            })
        })
        .collect();
    serde_json::json!({ "Records": records })
}
