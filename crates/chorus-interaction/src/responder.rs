//! Persona responder: one persona, one reply.

use std::sync::Arc;

use async_trait::async_trait;
use chorus_core::conversation::Message;
use chorus_core::persona::Persona;

use crate::provider::{CompletionProvider, CompletionRequest, ProviderError};

/// Fixed text used when a persona's completion fails.
pub const APOLOGY_TEXT: &str =
    "I apologize, but I encountered an issue while processing your request. Please try again later.";

/// Sampling temperature for persona replies.
pub const DEFAULT_RESPONSE_TEMPERATURE: f32 = 0.7;

/// Token ceiling for persona replies.
pub const DEFAULT_RESPONSE_MAX_TOKENS: u32 = 1024;

/// Produces one AI message from a persona given the ordered history.
#[async_trait]
pub trait PersonaResponder: Send + Sync {
    async fn respond(&self, persona: &Persona, history: &[Message])
    -> Result<Message, ProviderError>;
}

/// The apology a persona posts when its completion call failed.
pub fn apology_message(persona: &Persona) -> Message {
    Message::ai(persona.id.clone(), APOLOGY_TEXT)
}

/// [`PersonaResponder`] backed by any [`CompletionProvider`].
pub struct ProviderResponder {
    provider: Arc<dyn CompletionProvider>,
    temperature: f32,
    max_tokens: u32,
}

impl ProviderResponder {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            provider,
            temperature: DEFAULT_RESPONSE_TEMPERATURE,
            max_tokens: DEFAULT_RESPONSE_MAX_TOKENS,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[async_trait]
impl PersonaResponder for ProviderResponder {
    async fn respond(
        &self,
        persona: &Persona,
        history: &[Message],
    ) -> Result<Message, ProviderError> {
        tracing::debug!(
            target: "chorus::completion",
            persona = %persona.name,
            model = %persona.model,
            history_len = history.len(),
            "Requesting response"
        );

        let request =
            CompletionRequest::for_persona(persona, history, self.temperature, self.max_tokens);
        let text = self.provider.complete(&request).await?;

        Ok(Message::ai(persona.id.clone(), text))
    }
}
