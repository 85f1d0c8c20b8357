use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Summary returned by the queue-triggered functions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchOutcome {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub processed: usize,
    pub skipped: usize,
    pub message: String,
}

impl BatchOutcome {
    pub fn completed(processed: usize, skipped: usize) -> Self {
        Self {
            status_code: 200,
            processed,
            skipped,
            message: format!("Processed {processed} record(s), skipped {skipped}"),
        }
    }

    pub fn failed(status_code: u16, processed: usize, skipped: usize, message: String) -> Self {
        Self {
            status_code,
            processed,
            skipped,
            message,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }
}

pub fn is_sqs_event(event: &Value) -> bool {
    event
        .get("Records")
        .and_then(Value::as_array)
        .map(|records| {
            !records.is_empty()
                && records.iter().all(|record| {
                    record
                        .get("eventSource")
                        .and_then(Value::as_str)
                        .map(|source| source == "aws:sqs")
                        .unwrap_or(false)
                })
        })
        .unwrap_or(false)
}

pub fn record_bodies(event: &Value) -> Result<Vec<&str>, String> {
    let records = event
        .get("Records")
        .and_then(Value::as_array)
        .ok_or_else(|| "SQS event must include Records array".to_string())?;

    records
        .iter()
        .map(|record| {
            record
                .get("body")
                .and_then(Value::as_str)
                .ok_or_else(|| "SQS record body must be a string".to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn detects_sqs_event_shape() {
        let event = json!({
            "Records": [
                {"eventSource": "aws:sqs", "body": "{}"}
            ]
        });
        assert!(is_sqs_event(&event));
    }

    #[test]
    fn rejects_non_sqs_records() {
        let event = json!({
            "Records": [
                {"eventSource": "aws:s3", "body": "{}"}
            ]
        });
        assert!(!is_sqs_event(&event));
        assert!(!is_sqs_event(&json!({"Records": []})));
    }

    #[test]
    fn rejects_record_without_body_string() {
        let event = json!({
            "Records": [
                {"eventSource": "aws:sqs", "body": 42}
            ]
        });

        let error = record_bodies(&event).expect_err("non-string body should fail");
        assert!(error.contains("SQS record body must be a string"));
    }

    #[test]
    fn outcome_serializes_with_status_code_field() {
        let outcome = serde_json::to_value(BatchOutcome::completed(2, 1)).expect("serializes");
        assert_eq!(outcome["statusCode"], 200);
        assert_eq!(outcome["skipped"], 1);
    }
}
