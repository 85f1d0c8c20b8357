use std::time::Duration;

use super::AdapterError;

pub trait BillObjectStore {
    fn put_object(&self, key: &str, body: &[u8], content_type: &str) -> Result<(), AdapterError>;

    /// Unsigned URL recorded on the bill at upload time.
    fn object_url(&self, key: &str) -> String;

    fn presign_get(&self, key: &str, ttl: Duration) -> Result<String, AdapterError>;
}
