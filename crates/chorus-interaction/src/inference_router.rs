//! Model-driven responder selection.
//!
//! Asks a small, low-temperature model which participants should answer the
//! latest message. The decision call is best effort: when it fails the router
//! degrades according to its [`DecisionFailurePolicy`] and never returns an
//! error.

use std::sync::Arc;

use async_trait::async_trait;
use chorus_core::engagement::DecisionFailurePolicy;
use chorus_core::persona::Persona;
use chorus_core::routing::route_by_mention;

use crate::provider::{CompletionProvider, CompletionRequest, ProviderError, Turn};

/// Decision model used when none is configured.
pub const DEFAULT_DECIDER_MODEL: &str = "claude-3-haiku-20240307";

/// Low temperature keeps the decision close to deterministic.
pub const DEFAULT_DECIDER_TEMPERATURE: f32 = 0.2;

const DECIDER_MAX_TOKENS: u32 = 64;

const ALL_DECISION: &str = "all";
const NONE_DECISION: &str = "none";

const ROUTER_INSTRUCTION: &str = "You are a conversation router that determines which AI agents should respond to a message. \
Your job is to analyze the message content and determine which AI agents are most appropriate to respond. \
Output ONLY the names of the agents who should respond, separated by commas, \
or 'all' if all agents should respond. No other text or explanations.";

/// Selects the personas that should answer `last_content`.
///
/// An empty result means nobody should respond.
#[async_trait]
pub trait InferenceRouting: Send + Sync {
    async fn route_by_inference(&self, last_content: &str, participants: &[Persona])
    -> Vec<Persona>;
}

/// Parsed answer of the decision model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingDecision {
    /// Every participant responds.
    All,
    /// These participants respond, in participant order.
    Selected(Vec<Persona>),
    /// The model explicitly selected nobody.
    Nobody,
}

impl RoutingDecision {
    pub fn into_personas(self, participants: &[Persona]) -> Vec<Persona> {
        match self {
            RoutingDecision::All => participants.to_vec(),
            RoutingDecision::Selected(personas) => personas,
            RoutingDecision::Nobody => Vec::new(),
        }
    }
}

/// Interprets the raw decision text.
///
/// `all` selects everyone and `none` selects nobody (both case-insensitive).
/// Anything else is read as a comma-separated list of display names; if no
/// name matches, the first participant is selected.
pub fn parse_decision(raw: &str, participants: &[Persona]) -> RoutingDecision {
    let decision = raw
        .trim()
        .trim_matches(|c: char| c == '\'' || c == '"' || c == '.')
        .trim()
        .to_lowercase();

    if decision == ALL_DECISION {
        return RoutingDecision::All;
    }
    if decision == NONE_DECISION {
        return RoutingDecision::Nobody;
    }

    let selected_names: Vec<&str> = decision
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect();

    let selected: Vec<Persona> = participants
        .iter()
        .filter(|p| selected_names.iter().any(|name| p.has_name(name)))
        .cloned()
        .collect();

    if selected.is_empty() {
        tracing::warn!(
            target: "chorus::inference",
            decision = %decision,
            "No matching participants found from inference, defaulting to first participant"
        );
        return match participants.first() {
            Some(first) => RoutingDecision::Selected(vec![first.clone()]),
            None => RoutingDecision::Nobody,
        };
    }

    RoutingDecision::Selected(selected)
}

/// Settings of the decision call.
#[derive(Debug, Clone, PartialEq)]
pub struct DeciderConfig {
    pub model: String,
    pub temperature: f32,
    pub on_failure: DecisionFailurePolicy,
}

impl Default for DeciderConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_DECIDER_MODEL.to_string(),
            temperature: DEFAULT_DECIDER_TEMPERATURE,
            on_failure: DecisionFailurePolicy::default(),
        }
    }
}

/// [`InferenceRouting`] implementation that consults a completion provider.
pub struct InferenceRouter {
    provider: Arc<dyn CompletionProvider>,
    config: DeciderConfig,
}

impl InferenceRouter {
    pub fn new(provider: Arc<dyn CompletionProvider>, config: DeciderConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &DeciderConfig {
        &self.config
    }

    /// Builds the decision request for the given message and candidates.
    pub fn build_request(&self, last_content: &str, participants: &[Persona]) -> CompletionRequest {
        let candidates = participants
            .iter()
            .map(|p| format!("- {}: {}", p.name, p.instructions_summary()))
            .collect::<Vec<_>>()
            .join("\n");

        let context = format!(
            "Looking at this message: \"{last_content}\"\n\n\
             Which of these AI participants should respond?\n\n\
             {candidates}\n\n\
             Reply with ONLY the names separated by commas (e.g., 'assistant,critic'), \
             or 'all' if all participants should respond. If no specific agent is appropriate, \
             select the most suitable one based on the message content. \
             Reply 'none' only if the conversation has clearly come to an end."
        );

        CompletionRequest {
            model: self.config.model.clone(),
            system: Some(ROUTER_INSTRUCTION.to_string()),
            turns: vec![Turn::user(context)],
            temperature: self.config.temperature,
            max_tokens: DECIDER_MAX_TOKENS,
        }
    }

    fn recover(&self, err: &ProviderError, last_content: &str, participants: &[Persona]) -> Vec<Persona> {
        match self.config.on_failure {
            DecisionFailurePolicy::FallbackToMentions => {
                tracing::warn!(
                    target: "chorus::inference",
                    error = %err,
                    "Error determining responders by inference, falling back to mention routing"
                );
                route_by_mention(last_content, participants)
            }
            DecisionFailurePolicy::EndConversation => {
                tracing::warn!(
                    target: "chorus::inference",
                    error = %err,
                    "Error determining responders by inference, selecting nobody"
                );
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl InferenceRouting for InferenceRouter {
    async fn route_by_inference(
        &self,
        last_content: &str,
        participants: &[Persona],
    ) -> Vec<Persona> {
        if participants.is_empty() {
            return Vec::new();
        }

        let request = self.build_request(last_content, participants);
        match self.provider.complete(&request).await {
            Ok(raw) if raw.trim().is_empty() => {
                self.recover(&ProviderError::EmptyResponse, last_content, participants)
            }
            Ok(raw) => {
                tracing::info!(
                    target: "chorus::inference",
                    decision = %raw.trim(),
                    "Inference decision"
                );
                parse_decision(&raw, participants).into_personas(participants)
            }
            Err(err) => self.recover(&err, last_content, participants),
        }
    }
}
