//! API Gateway proxy plumbing shared by the HTTP functions.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bill_capture_core::auth::{bearer_token, verify_token, TokenClaims};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiGatewayResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub headers: Value,
    pub body: String,
}

impl ApiGatewayResponse {
    /// The body parsed back into JSON.
    pub fn json_body(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }
}

pub fn response_headers() -> Value {
    json!({
        "Content-Type": "application/json",
        "Access-Control-Allow-Origin": "*",
        "Access-Control-Allow-Headers": "Content-Type,Authorization",
        "Access-Control-Allow-Methods": "OPTIONS,GET,POST",
    })
}

pub fn success_response(status_code: u16, payload: impl Serialize) -> ApiGatewayResponse {
    match serde_json::to_string(&payload) {
        Ok(body) => ApiGatewayResponse {
            status_code,
            headers: response_headers(),
            body,
        },
        Err(error) => server_error_response("Error serializing response", &error.to_string()),
    }
}

pub fn error_response(status_code: u16, payload: Value) -> ApiGatewayResponse {
    ApiGatewayResponse {
        status_code,
        headers: response_headers(),
        body: payload.to_string(),
    }
}

pub fn message_response(status_code: u16, message: &str) -> ApiGatewayResponse {
    error_response(status_code, json!({ "message": message }))
}

pub fn server_error_response(message: &str, error: &str) -> ApiGatewayResponse {
    error_response(500, json!({ "message": message, "error": error }))
}

pub fn preflight_response() -> ApiGatewayResponse {
    message_response(200, "CORS preflight request successful")
}

/// REST (`httpMethod`) and HTTP API (`requestContext.http.method`) events.
pub fn is_preflight(event: &Value) -> bool {
    let method = event
        .get("httpMethod")
        .and_then(Value::as_str)
        .or_else(|| event.pointer("/requestContext/http/method").and_then(Value::as_str));
    method.is_some_and(|method| method.eq_ignore_ascii_case("OPTIONS"))
}

/// Extracts the JSON payload from a proxy event. A body may be a JSON string
/// (optionally base64 encoded), an already-parsed object, or absent, in which
/// case the event itself is the payload.
pub fn normalize_apigw_event(event: Value) -> Result<Value, String> {
    let Some(object) = event.as_object() else {
        return Err("Request payload must be a JSON object".to_string());
    };

    let Some(body) = object.get("body") else {
        return Ok(event);
    };

    let base64_encoded = object
        .get("isBase64Encoded")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    match body {
        Value::Null => Ok(json!({})),
        Value::Object(_) => Ok(body.clone()),
        Value::String(text) if base64_encoded => {
            let decoded = STANDARD
                .decode(text.trim().as_bytes())
                .map_err(|error| format!("Malformed base64 body: {error}"))?;
            serde_json::from_slice(&decoded).map_err(|error| format!("Malformed JSON body: {error}"))
        }
        Value::String(text) if text.trim().is_empty() => Ok(json!({})),
        Value::String(text) => {
            serde_json::from_str(text).map_err(|error| format!("Malformed JSON body: {error}"))
        }
        _ => Err("Request body must be a JSON object".to_string()),
    }
}

pub fn header<'a>(event: &'a Value, name: &str) -> Option<&'a str> {
    event
        .get("headers")
        .and_then(Value::as_object)?
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .and_then(|(_, value)| value.as_str())
}

pub fn query_param<'a>(event: &'a Value, name: &str) -> Option<&'a str> {
    event
        .get("queryStringParameters")
        .and_then(|params| params.get(name))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Claims of a valid bearer token, if the request carries one. Invalid tokens
/// are treated as absent.
pub fn authenticated_user(
    event: &Value,
    secret: Option<&str>,
    now_epoch_secs: i64,
) -> Option<TokenClaims> {
    let secret = secret?;
    let token = header(event, "Authorization").and_then(bearer_token)?;
    match verify_token(token, secret, now_epoch_secs) {
        Ok(claims) => Some(claims),
        Err(error) => {
            tracing::warn!(%error, "ignoring invalid bearer token");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use bill_capture_core::auth::issue_token;

    use super::*;

    #[test]
    fn accepts_string_object_and_missing_bodies() {
        assert_eq!(
            normalize_apigw_event(json!({"body": "{\"billId\":\"b1\"}"})),
            Ok(json!({"billId": "b1"}))
        );
        assert_eq!(
            normalize_apigw_event(json!({"body": {"billId": "b1"}})),
            Ok(json!({"billId": "b1"}))
        );
        assert_eq!(
            normalize_apigw_event(json!({"billId": "b1"})),
            Ok(json!({"billId": "b1"}))
        );
        assert_eq!(normalize_apigw_event(json!({"body": null})), Ok(json!({})));
    }

    #[test]
    fn decodes_base64_bodies() {
        let encoded = STANDARD.encode(br#"{"email":"ada@example.com"}"#);
        assert_eq!(
            normalize_apigw_event(json!({"body": encoded, "isBase64Encoded": true})),
            Ok(json!({"email": "ada@example.com"}))
        );
    }

    #[test]
    fn rejects_malformed_bodies() {
        let error = normalize_apigw_event(json!({"body": "{not json"})).expect_err("should fail");
        assert!(error.starts_with("Malformed JSON body"));
        assert!(normalize_apigw_event(json!({"body": 12})).is_err());
        assert!(normalize_apigw_event(json!("text")).is_err());
    }

    #[test]
    fn responses_carry_cors_headers() {
        let response = preflight_response();
        assert_eq!(response.status_code, 200);
        assert_eq!(response.headers["Access-Control-Allow-Origin"], "*");
        assert_eq!(
            response.headers["Access-Control-Allow-Methods"],
            "OPTIONS,GET,POST"
        );
    }

    #[test]
    fn detects_preflight_for_both_event_versions() {
        assert!(is_preflight(&json!({"httpMethod": "OPTIONS"})));
        assert!(is_preflight(
            &json!({"requestContext": {"http": {"method": "options"}}})
        ));
        assert!(!is_preflight(&json!({"httpMethod": "POST"})));
    }

    #[test]
    fn reads_bearer_claims_case_insensitively() {
        let claims = TokenClaims {
            user_id: "user-1".to_string(),
            email: "ada@example.com".to_string(),
            exp: 2_000,
        };
        let token = issue_token(&claims, "secret");
        let event = json!({"headers": {"authorization": format!("Bearer {token}")}});

        assert_eq!(
            authenticated_user(&event, Some("secret"), 1_000),
            Some(claims)
        );
        assert_eq!(authenticated_user(&event, Some("other"), 1_000), None);
        assert_eq!(authenticated_user(&event, None, 1_000), None);
    }

    #[test]
    fn reads_query_parameters() {
        let event = json!({"queryStringParameters": {"userId": " u1 ", "limit": ""}});
        assert_eq!(query_param(&event, "userId"), Some("u1"));
        assert_eq!(query_param(&event, "limit"), None);
        assert_eq!(query_param(&json!({"queryStringParameters": null}), "userId"), None);
    }
}
