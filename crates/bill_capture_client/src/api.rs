use std::path::Path;
use std::time::Duration;

use bill_capture_core::auth::PublicUser;
use bill_capture_core::contract::{Bill, UploadAccepted};
use bill_capture_core::envelope::{
    extract_bill, extract_bill_data, extract_bills, parse_response_text, EnvelopeError,
};
use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ClientError;
use crate::files::read_upload;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginSession {
    pub token: String,
    pub user: PublicUser,
}

/// Blocking client for the HTTP functions behind one API base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Sends `Authorization: Bearer <token>` on every request.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|token| !token.trim().is_empty());
        self
    }

    pub fn register(&self, email: &str, password: &str, name: &str) -> Result<PublicUser, ClientError> {
        let payload = self.execute(self.http.post(self.endpoint("/auth/register")).json(&json!({
            "email": email,
            "password": password,
            "name": name,
        })))?;
        member(&payload, "user")
    }

    pub fn login(&self, email: &str, password: &str) -> Result<LoginSession, ClientError> {
        let payload = self.execute(
            self.http
                .post(self.endpoint("/auth/login"))
                .json(&json!({ "email": email, "password": password })),
        )?;
        serde_json::from_value(payload)
            .map_err(|error| ClientError::InvalidResponse(format!("login response: {error}")))
    }

    pub fn upload(&self, path: &Path, user_id: Option<&str>) -> Result<UploadAccepted, ClientError> {
        let request = read_upload(path, user_id)?;
        tracing::info!(path = %path.display(), "uploading receipt");
        let payload = self.execute(self.http.post(self.endpoint("/bills")).json(&request))?;
        member(&payload, "data")
    }

    /// Every bill of the owner, following pagination tokens.
    pub fn fetch_bills(&self, user_id: Option<&str>) -> Result<Vec<Bill>, ClientError> {
        let mut bills = Vec::new();
        let mut start_key: Option<String> = None;
        loop {
            let mut query: Vec<(&str, &str)> = Vec::new();
            if let Some(user_id) = user_id {
                query.push(("userId", user_id));
            }
            if let Some(key) = start_key.as_deref() {
                query.push(("startKey", key));
            }
            let payload = self.execute(self.http.get(self.endpoint("/bills")).query(&query))?;
            bills.extend(extract_bills(&payload)?);

            match payload.get("lastEvaluatedKey").and_then(Value::as_str) {
                Some(key) if !key.is_empty() => start_key = Some(key.to_string()),
                _ => return Ok(bills),
            }
        }
    }

    /// Basic view of one bill.
    pub fn fetch_bill(&self, bill_id: &str) -> Result<Value, ClientError> {
        let payload = self.get_bill(bill_id, false)?;
        Ok(extract_bill(&payload)?)
    }

    /// Full analysis data of one bill. Failures degrade to a placeholder
    /// record instead of an error.
    pub fn fetch_bill_data(&self, bill_id: &str) -> Bill {
        let response = self.get_bill(bill_id, true);
        if let Err(error) = &response {
            tracing::warn!(bill_id, %error, "falling back to placeholder bill data");
        }
        extract_bill_data(response, bill_id)
    }

    fn get_bill(&self, bill_id: &str, data_request: bool) -> Result<Value, ClientError> {
        self.execute(
            self.http
                .post(self.endpoint("/get-bill"))
                .json(&json!({ "billId": bill_id, "isDataRequest": data_request })),
        )
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn execute(&self, request: RequestBuilder) -> Result<Value, ClientError> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.send()?;
        let status = response.status().as_u16();
        let text = response.text()?;
        tracing::debug!(status, "response received");
        decode_response(status, &text)
    }
}

/// Unwraps a response body, turning non-2xx statuses into [`ClientError::Api`]
/// with the server's `message` when it sent one.
pub fn decode_response(status: u16, text: &str) -> Result<Value, ClientError> {
    if (200..300).contains(&status) {
        return Ok(parse_response_text(text)?);
    }
    let message = match parse_response_text(text) {
        Err(EnvelopeError::MissingAuthentication) => {
            return Err(EnvelopeError::MissingAuthentication.into())
        }
        Ok(payload) => payload
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| text.to_string()),
        Err(_) => text.to_string(),
    };
    Err(ClientError::Api { status, message })
}

fn member<T: DeserializeOwned>(payload: &Value, name: &'static str) -> Result<T, ClientError> {
    let value = payload
        .get(name)
        .cloned()
        .ok_or(EnvelopeError::MissingField(name))?;
    serde_json::from_value(value)
        .map_err(|error| ClientError::InvalidResponse(format!("{name}: {error}")))
}
