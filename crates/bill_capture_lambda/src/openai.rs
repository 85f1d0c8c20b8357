//! Chat-completions client used to categorize receipt items.

use std::time::Duration;

use bill_capture_core::categorization::{build_prompt, parse_categorized_reply};
use bill_capture_core::contract::{CategorizedItem, ReceiptItem};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::adapters::categorizer::ItemCategorizer;
use crate::adapters::AdapterError;
use crate::aws::block_on;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_TOKENS: u32 = 500;
const TEMPERATURE: f32 = 0.3;

pub struct OpenAiCategorizer {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
}

impl OpenAiCategorizer {
    pub fn new(
        api_key: impl Into<String>,
        api_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, AdapterError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|error| AdapterError::Categorizer(format!("failed to build client: {error}")))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            api_url: api_url.into(),
            model: model.into(),
        })
    }

    async fn complete(&self, prompt: String) -> Result<String, AdapterError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "system".to_string(),
                content: prompt,
            }],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        tracing::debug!(model = %self.model, "sending categorization request");
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|error| AdapterError::Categorizer(format!("request failed: {error}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(AdapterError::Categorizer(format!(
                "model returned {status}: {error_body}"
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|error| AdapterError::Categorizer(format!("unreadable response: {error}")))?;
        Ok(chat
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default())
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

impl ItemCategorizer for OpenAiCategorizer {
    fn categorize(
        &self,
        items: &[ReceiptItem],
        categories: &[String],
    ) -> Result<Vec<CategorizedItem>, AdapterError> {
        let prompt = build_prompt(items, categories);
        let content = block_on(self.complete(prompt))?;
        parse_categorized_reply(&content)
            .map_err(|error| AdapterError::Categorizer(error.to_string()))
    }
}
