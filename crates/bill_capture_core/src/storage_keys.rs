use std::collections::BTreeMap;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::contract::{ValidationError, DEFAULT_FILE_NAME};

/// Object key for an uploaded receipt: `{bill_id}-{file_name}`.
pub fn receipt_object_key(bill_id: &str, file_name: &str) -> String {
    format!("{bill_id}-{}", sanitize_file_name(file_name))
}

/// Plain (unsigned) virtual-hosted URL recorded alongside the bill.
pub fn object_url(bucket: &str, key: &str) -> String {
    format!("https://{bucket}.s3.amazonaws.com/{key}")
}

fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name)
        .trim();
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_control() { '_' } else { c })
        .collect();
    if cleaned.is_empty() {
        DEFAULT_FILE_NAME.to_string()
    } else {
        cleaned
    }
}

/// Encodes a table start key (attribute name to string value) as an opaque
/// query-string token.
pub fn encode_start_key(key: &BTreeMap<String, String>) -> String {
    let json = serde_json::to_vec(key).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(json)
}

pub fn decode_start_key(token: &str) -> Result<BTreeMap<String, String>, ValidationError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(token.trim().as_bytes())
        .map_err(|_| ValidationError::new("startKey is not a valid pagination token"))?;
    serde_json::from_slice(&bytes)
        .map_err(|_| ValidationError::new("startKey is not a valid pagination token"))
}
