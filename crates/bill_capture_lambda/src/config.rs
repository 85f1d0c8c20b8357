use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_BILL_BUCKET: &str = "bill-images";
pub const DEFAULT_BILL_TABLE: &str = "BillMetadata";
pub const DEFAULT_USERS_TABLE: &str = "Users";
pub const DEFAULT_CATEGORY_TABLE: &str = "category";
pub const DEFAULT_OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_SIGNED_URL_TTL_SECS: u64 = 3600;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} must be configured")]
    Missing(&'static str),
    #[error("{name} must be a positive integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

/// Settings shared by every function, read from the environment per
/// invocation. Values only some functions need stay optional here and are
/// checked by the `require_*` accessors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub bill_bucket: String,
    pub bill_table: String,
    pub users_table: String,
    pub category_table: String,
    pub extraction_queue_url: Option<String>,
    pub categorization_queue_url: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_api_url: String,
    pub openai_model: String,
    pub auth_token_secret: Option<String>,
    pub signed_url_ttl: Duration,
}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let with_default =
            |name: &str, default: &str| read(name).unwrap_or_else(|| default.to_string());

        let signed_url_ttl = match read("SIGNED_URL_TTL_SECS") {
            None => Duration::from_secs(DEFAULT_SIGNED_URL_TTL_SECS),
            Some(value) => match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidNumber {
                        name: "SIGNED_URL_TTL_SECS",
                        value,
                    })
                }
            },
        };

        Ok(Self {
            bill_bucket: with_default("BILL_BUCKET", DEFAULT_BILL_BUCKET),
            bill_table: with_default("BILL_TABLE", DEFAULT_BILL_TABLE),
            users_table: with_default("USERS_TABLE", DEFAULT_USERS_TABLE),
            category_table: with_default("CATEGORY_TABLE", DEFAULT_CATEGORY_TABLE),
            extraction_queue_url: read("EXTRACTION_QUEUE_URL"),
            categorization_queue_url: read("CATEGORIZATION_QUEUE_URL"),
            openai_api_key: read("OPENAI_API_KEY"),
            openai_api_url: with_default("OPENAI_API_URL", DEFAULT_OPENAI_API_URL),
            openai_model: with_default("OPENAI_MODEL", DEFAULT_OPENAI_MODEL),
            auth_token_secret: read("AUTH_TOKEN_SECRET"),
            signed_url_ttl,
        })
    }

    pub fn require_extraction_queue(&self) -> Result<&str, ConfigError> {
        self.extraction_queue_url
            .as_deref()
            .ok_or(ConfigError::Missing("EXTRACTION_QUEUE_URL"))
    }

    pub fn require_categorization_queue(&self) -> Result<&str, ConfigError> {
        self.categorization_queue_url
            .as_deref()
            .ok_or(ConfigError::Missing("CATEGORIZATION_QUEUE_URL"))
    }

    pub fn require_auth_secret(&self) -> Result<&str, ConfigError> {
        self.auth_token_secret
            .as_deref()
            .ok_or(ConfigError::Missing("AUTH_TOKEN_SECRET"))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<RuntimeConfig, ConfigError> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        RuntimeConfig::from_lookup(|name| values.get(name).cloned())
    }

    #[test]
    fn applies_defaults_for_unset_values() {
        let config = config_from(&[]).expect("defaults should load");
        assert_eq!(config.bill_bucket, DEFAULT_BILL_BUCKET);
        assert_eq!(config.bill_table, DEFAULT_BILL_TABLE);
        assert_eq!(config.openai_model, DEFAULT_OPENAI_MODEL);
        assert_eq!(config.signed_url_ttl, Duration::from_secs(3600));
        assert_eq!(config.openai_api_key, None);
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = config_from(&[("BILL_BUCKET", "  "), ("OPENAI_API_KEY", "")])
            .expect("config should load");
        assert_eq!(config.bill_bucket, DEFAULT_BILL_BUCKET);
        assert_eq!(config.openai_api_key, None);
    }

    #[test]
    fn required_values_report_their_names() {
        let config = config_from(&[("EXTRACTION_QUEUE_URL", "https://sqs/extract")])
            .expect("config should load");
        assert_eq!(config.require_extraction_queue(), Ok("https://sqs/extract"));
        let error = config
            .require_categorization_queue()
            .expect_err("queue is unset");
        assert_eq!(error.to_string(), "CATEGORIZATION_QUEUE_URL must be configured");
    }

    #[test]
    fn rejects_invalid_ttl() {
        assert!(matches!(
            config_from(&[("SIGNED_URL_TTL_SECS", "soon")]),
            Err(ConfigError::InvalidNumber { .. })
        ));
        assert!(config_from(&[("SIGNED_URL_TTL_SECS", "0")]).is_err());
    }
}
