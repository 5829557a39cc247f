//! Completion provider boundary.
//!
//! The orchestrator never talks to a model backend directly. It hands a
//! persona and the ordered history to a responder, which builds a
//! [`CompletionRequest`] and sends it through a [`CompletionProvider`].

use async_trait::async_trait;
use chorus_core::conversation::Message;
use chorus_core::engagement::CONTINUE_PLACEHOLDER;
use chorus_core::persona::Persona;
use thiserror::Error;

/// Role of one turn as seen by the completion backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
        }
    }
}

/// One role-tagged text turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }
}

/// A single request to a completion backend.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Opaque model selector
    pub model: String,
    /// System instructions, if any
    pub system: Option<String>,
    /// Ordered turns; the last one is always a `User` turn
    pub turns: Vec<Turn>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    /// Builds the request asking `persona` to reply to `history`.
    ///
    /// Human messages become user turns and AI messages become assistant
    /// turns, except the final message, which is always presented as a user
    /// turn so the backend produces a reply even when an AI spoke last.
    pub fn for_persona(
        persona: &Persona,
        history: &[Message],
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        let last_index = history.len().saturating_sub(1);
        let mut turns: Vec<Turn> = history
            .iter()
            .enumerate()
            .map(|(index, message)| match message {
                Message::Human { content, .. } => Turn::user(content.clone()),
                Message::Ai { content, .. } if index == last_index => Turn::user(content.clone()),
                Message::Ai { content, .. } => Turn::assistant(content.clone()),
            })
            .collect();

        if turns.is_empty() {
            turns.push(Turn::user(CONTINUE_PLACEHOLDER));
        }

        Self {
            model: persona.model.clone(),
            system: Some(persona.system_prompt.clone()),
            turns,
            temperature,
            max_tokens,
        }
    }
}

/// Errors a completion backend can report.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// The backend answered with a non-success HTTP status.
    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        message: String,
        retryable: bool,
    },

    /// The request never got a response (connection, timeout, ...).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The backend answered without any usable text.
    #[error("Provider returned an empty response")]
    EmptyResponse,

    /// The response body could not be understood.
    #[error("Failed to parse provider response: {0}")]
    Parse(String),

    /// The provider is not usable as configured (missing key, ...).
    #[error("Provider configuration error: {0}")]
    Config(String),
}

/// An external capability that turns a request into generated text.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError>;
}
