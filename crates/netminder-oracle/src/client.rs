//! HTTP oracle client
//!
//! Classification runs at temperature zero so repeated attempts on the
//! same message are as stable as the model allows; participant-facing
//! replies are sampled. Rate limits and server errors are retried with
//! exponential backoff before the error reaches the assistant.

use async_trait::async_trait;
use netminder_core::{ChatMessage, NetminderError, Result};
use std::time::Duration;
use tracing::{debug, warn};

use crate::envelope::{extract_field_or_raw, trim_history};
use crate::oracle::Oracle;
use crate::types::{ApiMessage, ApiRequest, ApiResponse, Model};

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: usize = 1024;

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_SECS: u64 = 5;
const MAX_BACKOFF_SECS: u64 = 60;

const SAMPLED_TEMPERATURE: f32 = 0.7;

/// Oracle implementation backed by a hosted model API
#[derive(Debug, Clone)]
pub struct ModelClient {
    model: Model,
    max_tokens: usize,
    api_key: String,
}

impl ModelClient {
    /// Create a new client with an explicit API key
    pub fn new(model: Model, api_key: impl Into<String>) -> Self {
        Self {
            model,
            max_tokens: DEFAULT_MAX_TOKENS,
            api_key: api_key.into(),
        }
    }

    /// Create a client reading the API key from the given environment variable
    pub fn from_env(model: Model, api_key_env: &str) -> Result<Self> {
        let api_key = std::env::var(api_key_env).map_err(|_| {
            NetminderError::Config(format!("Missing API key in ${}", api_key_env))
        })?;
        Ok(Self::new(model, api_key))
    }

    /// Set max tokens for responses
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Send one completion request, retrying rate limits and server errors
    async fn complete(&self, messages: Vec<ApiMessage>, temperature: f32) -> Result<String> {
        let request = ApiRequest {
            model: self.model.api_name().to_string(),
            max_tokens: self.max_tokens,
            temperature,
            messages,
        };

        let mut retries = 0;
        let mut backoff_secs = INITIAL_BACKOFF_SECS;

        loop {
            debug!("Sending oracle request (attempt {})", retries + 1);

            let client = reqwest::Client::new();
            let response = client
                .post(API_URL)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", API_VERSION)
                .header("content-type", "application/json")
                .json(&request)
                .send()
                .await
                .map_err(|e| NetminderError::Oracle(format!("Failed to send request: {}", e)))?;

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                retries += 1;

                if retries > MAX_RETRIES {
                    let error_text = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown".to_string());
                    return Err(NetminderError::Oracle(format!(
                        "Gave up after {} retries ({}): {}",
                        MAX_RETRIES, status, error_text
                    )));
                }

                let wait_secs = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(backoff_secs);

                warn!(
                    "Oracle returned {}. Waiting {}s before retry {}/{}",
                    status, wait_secs, retries, MAX_RETRIES
                );

                tokio::time::sleep(Duration::from_secs(wait_secs)).await;
                backoff_secs = (backoff_secs * 2).min(MAX_BACKOFF_SECS);
                continue;
            }

            if !status.is_success() {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown".to_string());
                return Err(NetminderError::Oracle(format!(
                    "Oracle API error {}: {}",
                    status, error_text
                )));
            }

            let parsed: ApiResponse = response
                .json()
                .await
                .map_err(|e| NetminderError::Oracle(format!("Failed to parse response: {}", e)))?;

            let text = parsed
                .content
                .first()
                .map(|c| c.text.clone())
                .unwrap_or_default();

            return Ok(text);
        }
    }

    /// Convert a conversation into API messages, trimmed to the budget,
    /// with the extra directives appended at the end.
    fn build_request(history: &[ChatMessage], directives: &[&str]) -> Vec<ApiMessage> {
        let mut trimmed = history.to_vec();
        trim_history(&mut trimmed);

        let mut messages: Vec<ApiMessage> = trimmed.iter().map(ApiMessage::from).collect();
        for directive in directives {
            if !directive.is_empty() {
                messages.push(ApiMessage {
                    role: "system".to_string(),
                    content: directive.to_string(),
                });
            }
        }
        messages
    }
}

#[async_trait]
impl Oracle for ModelClient {
    async fn classify(&self, history: &[ChatMessage], labels: &[&str]) -> Result<String> {
        let directive = format!(
            "Classify the last message from the user into one of the following message_type values: {}; \
             Reply in the following format, replacing the text in the <> with your classification: \
             {{\"message_type\": \"<classification>\"}}",
            labels.join(", ")
        );

        let messages = Self::build_request(history, &[&directive]);
        let raw = self.complete(messages, 0.0).await?;
        let label = extract_field_or_raw(&raw, "message_type")
            .trim()
            .to_lowercase();

        debug!("Classified message as {:?}", label);
        Ok(label)
    }

    async fn analyze(&self, history: &[ChatMessage], question: &str) -> Result<bool> {
        let directive = format!(
            "Answer the question from the following message_type list: yes, no; \
             Reply in the following format, replacing the text in the <> with your answer: \
             {{\"message_type\": \"<answer>\"}} \
             Question: {}",
            question
        );

        let messages = Self::build_request(history, &[&directive]);
        let raw = self.complete(messages, 0.0).await?;
        let answer = extract_field_or_raw(&raw, "message_type")
            .trim()
            .to_lowercase();

        debug!("Analysis {:?} -> {:?}", question, answer);
        Ok(answer == "yes")
    }

    async fn generate(&self, history: &[ChatMessage], directive: &str) -> Result<String> {
        let envelope = "Reply in the following format, replacing the text in the <> with your \
                        message: {\"response\": \"<your response>\"}";

        let messages = Self::build_request(history, &[directive, envelope]);
        let raw = self.complete(messages, SAMPLED_TEMPERATURE).await?;

        Ok(extract_field_or_raw(&raw, "response"))
    }
}
