//! Configuration file DTOs.
//!
//! Every section and field is optional in the file; missing values take the
//! defaults below.

use chorus_core::engagement::{DEFAULT_MAX_MESSAGES, DecisionFailurePolicy};
use chorus_core::persona::Persona;
use serde::{Deserialize, Serialize};

/// Root of `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootConfig {
    pub self_engagement: SelfEngagementSection,
    pub pacing: PacingSection,
    pub decider: DeciderSection,
    pub completion: CompletionSection,
    pub anthropic: AnthropicSection,
    pub logging: LoggingSection,
    /// Replaces the built-in persona registry when non-empty.
    #[serde(rename = "persona")]
    pub personas: Vec<PersonaConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelfEngagementSection {
    pub max_messages: usize,
}

impl Default for SelfEngagementSection {
    fn default() -> Self {
        Self {
            max_messages: DEFAULT_MAX_MESSAGES,
        }
    }
}

/// Delays of the self-engagement loop, in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingSection {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Wait before a run starts after it was triggered.
    pub start_delay_ms: u64,
}

impl Default for PacingSection {
    fn default() -> Self {
        Self {
            min_delay_ms: 1000,
            max_delay_ms: 3000,
            start_delay_ms: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeciderSection {
    pub model: String,
    pub temperature: f32,
    pub on_failure: DecisionFailurePolicy,
}

impl Default for DeciderSection {
    fn default() -> Self {
        Self {
            model: "claude-3-haiku-20240307".to_string(),
            temperature: 0.2,
            on_failure: DecisionFailurePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionSection {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for CompletionSection {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1024,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnthropicSection {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
    /// Write log lines to stderr. The REPL already shows Chorus diagnostics inline.
    pub console: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            console: false,
        }
    }
}

/// A `[[persona]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub color: String,
    pub model: String,
    pub system_prompt: String,
}

impl From<PersonaConfig> for Persona {
    fn from(dto: PersonaConfig) -> Self {
        Persona {
            id: dto.id,
            name: dto.name,
            avatar: dto.avatar,
            color: dto.color,
            model: dto.model,
            system_prompt: dto.system_prompt,
        }
    }
}

impl From<&Persona> for PersonaConfig {
    fn from(persona: &Persona) -> Self {
        PersonaConfig {
            id: persona.id.clone(),
            name: persona.name.clone(),
            avatar: persona.avatar.clone(),
            color: persona.color.clone(),
            model: persona.model.clone(),
            system_prompt: persona.system_prompt.clone(),
        }
    }
}
