//! Serialized representations of on-disk configuration.

mod config;

pub use config::{
    AnthropicSection, CompletionSection, DeciderSection, LoggingSection, PacingSection,
    PersonaConfig, RootConfig, SelfEngagementSection,
};
