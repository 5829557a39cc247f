//! Persona domain model.
//!
//! Represents AI personas that participate in conversations with users.
//! A persona is an immutable identity: it is created once when the registry is
//! loaded and never mutated during a session.

use serde::{Deserialize, Serialize};

/// A persona representing an AI agent with its own behavioral instructions.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    /// Unique identifier (e.g. `ai-assistant`)
    pub id: String,
    /// Display name, also used as the mention token (`@name`, case-insensitive)
    pub name: String,
    /// Avatar glyph (presentation only)
    pub avatar: String,
    /// Display color as a hex string (presentation only)
    pub color: String,
    /// Opaque model identifier passed to the completion provider
    pub model: String,
    /// Persona-specific behavioral prompt
    pub system_prompt: String,
}

impl Persona {
    /// Returns the first line of the system prompt.
    ///
    /// Used as a one-line summary when asking the decision model who should respond.
    pub fn instructions_summary(&self) -> &str {
        self.system_prompt.lines().next().unwrap_or("").trim()
    }

    /// Lowercased mention token for this persona, including the `@` prefix.
    pub fn mention_token(&self) -> String {
        format!("@{}", self.name.to_lowercase())
    }

    /// Case-insensitive comparison against a display name.
    pub fn has_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.trim().to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn persona(name: &str, prompt: &str) -> Persona {
        Persona {
            id: format!("ai-{name}"),
            name: name.to_string(),
            avatar: "🤖".to_string(),
            color: "#000000".to_string(),
            model: "test-model".to_string(),
            system_prompt: prompt.to_string(),
        }
    }

    #[test]
    fn test_instructions_summary_uses_first_line() {
        let p = persona("assistant", "You are helpful.\n\nMore rules here");
        assert_eq!(p.instructions_summary(), "You are helpful.");
    }

    #[test]
    fn test_instructions_summary_empty_prompt() {
        let p = persona("assistant", "");
        assert_eq!(p.instructions_summary(), "");
    }

    #[test]
    fn test_has_name_ignores_case() {
        let p = persona("Analyst", "x");
        assert!(p.has_name("analyst"));
        assert!(p.has_name(" ANALYST "));
        assert!(!p.has_name("critic"));
        assert_eq!(p.mention_token(), "@analyst");
    }
}
