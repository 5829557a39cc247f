//! Boundary to the language-model backend.
//!
//! - [`provider`]: request/turn types and the [`CompletionProvider`] trait
//! - [`claude_api_provider`]: Anthropic Messages API adapter
//! - [`responder`]: one persona reply per call, plus the apology fallback
//! - [`inference_router`]: model-driven responder selection

pub mod claude_api_provider;
pub mod inference_router;
pub mod provider;
pub mod responder;

pub use claude_api_provider::ClaudeApiProvider;
pub use inference_router::{
    DeciderConfig, InferenceRouter, InferenceRouting, RoutingDecision, parse_decision,
};
pub use provider::{CompletionProvider, CompletionRequest, ProviderError, Turn, TurnRole};
pub use responder::{APOLOGY_TEXT, PersonaResponder, ProviderResponder, apology_message};
