//! ClaudeApiProvider - Direct REST API implementation for Claude.
//!
//! Calls the Anthropic Messages API without any SDK.
//! Configuration priority: explicit values (config file) > environment variables

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::env;

use crate::provider::{CompletionProvider, CompletionRequest, ProviderError, Turn, TurnRole};
use chorus_core::engagement::CONTINUE_PLACEHOLDER;

/// Public Anthropic endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const MESSAGES_PATH: &str = "/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Completion provider that talks to the Claude HTTP API.
#[derive(Clone)]
pub struct ClaudeApiProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl ClaudeApiProvider {
    /// Creates a new provider for the public endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Loads the API key from `ANTHROPIC_API_KEY` (and the base URL from
    /// `ANTHROPIC_BASE_URL` when set).
    pub fn try_from_env() -> Result<Self, ProviderError> {
        let api_key = env::var("ANTHROPIC_API_KEY").map_err(|_| {
            ProviderError::Config(
                "ANTHROPIC_API_KEY not found in config.toml or environment variables".into(),
            )
        })?;

        let provider = Self::new(api_key);
        Ok(match env::var("ANTHROPIC_BASE_URL") {
            Ok(url) => provider.with_base_url(url),
            Err(_) => provider,
        })
    }

    /// Overrides the API base URL (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn send_request(&self, body: &CreateMessageRequest) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, MESSAGES_PATH))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|err| ProviderError::Transport(format!("Claude API request failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Claude error body".to_string());
            return Err(map_http_error(status, body_text));
        }

        let parsed: CreateMessageResponse = response
            .json()
            .await
            .map_err(|err| ProviderError::Parse(format!("Failed to parse Claude response: {err}")))?;

        extract_text_response(parsed)
    }
}

#[async_trait]
impl CompletionProvider for ClaudeApiProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let body = CreateMessageRequest {
            model: request.model.clone(),
            messages: to_api_messages(&request.turns),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: request.system.clone().filter(|s| !s.trim().is_empty()),
        };

        self.send_request(&body).await
    }
}

/// Converts turns into the strictly alternating sequence the Messages API
/// expects: it must start with a user message, and consecutive turns of the
/// same role are joined with a blank line.
fn to_api_messages(turns: &[Turn]) -> Vec<Message> {
    let mut messages: Vec<Message> = Vec::with_capacity(turns.len() + 1);

    if turns.first().map(|t| t.role) != Some(TurnRole::User) {
        messages.push(Message {
            role: TurnRole::User.as_str(),
            content: CONTINUE_PLACEHOLDER.to_string(),
        });
    }

    for turn in turns {
        match messages.last_mut() {
            Some(last) if last.role == turn.role.as_str() => {
                last.content.push_str("\n\n");
                last.content.push_str(&turn.content);
            }
            _ => messages.push(Message {
                role: turn.role.as_str(),
                content: turn.content.clone(),
            }),
        }
    }

    messages
}

#[derive(Serialize)]
struct CreateMessageRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

#[derive(Serialize, Debug, PartialEq)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct CreateMessageResponse {
    content: Vec<ContentBlockResponse>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum ContentBlockResponse {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[allow(dead_code)]
    r#type: String,
    message: String,
}

fn extract_text_response(response: CreateMessageResponse) -> Result<String, ProviderError> {
    let text = response
        .content
        .into_iter()
        .filter_map(|block| match block {
            ContentBlockResponse::Text { text } => Some(text),
            ContentBlockResponse::Other => None,
        })
        .collect::<Vec<_>>()
        .join("");

    if text.trim().is_empty() {
        return Err(ProviderError::EmptyResponse);
    }
    Ok(text)
}

fn map_http_error(status: StatusCode, body: String) -> ProviderError {
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or(body);

    let retryable = matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    );

    ProviderError::Http {
        status: status.as_u16(),
        message,
        retryable,
    }
}
