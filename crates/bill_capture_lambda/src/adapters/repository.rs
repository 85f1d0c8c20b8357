use std::collections::BTreeMap;

use bill_capture_core::auth::UserRecord;
use bill_capture_core::contract::Bill;

use super::AdapterError;

/// Table key as attribute name to string value.
pub type StartKey = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BillPage {
    pub bills: Vec<Bill>,
    pub last_evaluated_key: Option<StartKey>,
}

pub trait BillRepository {
    fn put_bill(&self, bill: &Bill) -> Result<(), AdapterError>;

    /// Point read by primary key.
    fn get_bill(&self, bill_id: &str) -> Result<Option<Bill>, AdapterError>;

    fn scan_bills_by_user(
        &self,
        user_id: &str,
        limit: usize,
        start_key: Option<&StartKey>,
    ) -> Result<BillPage, AdapterError>;

    /// Filtered scan on `billId`.
    fn find_bill(&self, bill_id: &str) -> Result<Option<Bill>, AdapterError>;
}

pub trait UserRepository {
    /// `email` is already lower-cased.
    fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AdapterError>;

    fn insert_user(&self, user: &UserRecord) -> Result<(), AdapterError>;

    fn record_login(&self, user_id: &str, at: &str) -> Result<(), AdapterError>;
}

pub trait CategorySource {
    fn category_names(&self) -> Result<Vec<String>, AdapterError>;
}
