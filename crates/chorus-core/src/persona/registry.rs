//! Read-only persona catalog.

use super::model::Persona;
use super::preset::get_default_presets;
use crate::error::{ChorusError, Result};
use std::collections::HashSet;

/// Ordered, immutable catalog of the personas available in a session.
///
/// Loaded once at startup (either the built-in presets or a configured list)
/// and shared read-only with the orchestrator.
#[derive(Debug, Clone)]
pub struct PersonaRegistry {
    personas: Vec<Persona>,
}

impl PersonaRegistry {
    /// Creates a registry from an ordered persona list.
    ///
    /// # Errors
    ///
    /// Returns `ChorusError::Config` when the list is empty, or when ids or
    /// (case-insensitive) names are duplicated or blank.
    pub fn new(personas: Vec<Persona>) -> Result<Self> {
        if personas.is_empty() {
            return Err(ChorusError::config("persona registry must not be empty"));
        }

        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        for persona in &personas {
            if persona.id.trim().is_empty() || persona.name.trim().is_empty() {
                return Err(ChorusError::config("persona id and name must not be blank"));
            }
            if persona.name.chars().any(char::is_whitespace) {
                return Err(ChorusError::config(format!(
                    "persona name '{}' must be a single word to be mentionable",
                    persona.name
                )));
            }
            if !ids.insert(persona.id.clone()) {
                return Err(ChorusError::config(format!(
                    "duplicate persona id '{}'",
                    persona.id
                )));
            }
            if !names.insert(persona.name.to_lowercase()) {
                return Err(ChorusError::config(format!(
                    "duplicate persona name '{}'",
                    persona.name
                )));
            }
        }

        Ok(Self { personas })
    }

    /// Registry with the built-in presets.
    pub fn with_defaults() -> Self {
        Self {
            personas: get_default_presets(),
        }
    }

    /// All personas in registry order.
    pub fn all(&self) -> &[Persona] {
        &self.personas
    }

    pub fn find(&self, id: &str) -> Option<&Persona> {
        self.personas.iter().find(|p| p.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Persona> {
        self.personas.iter().find(|p| p.has_name(name))
    }

    /// Looks up a persona by id, falling back to a case-insensitive name match.
    ///
    /// # Errors
    ///
    /// Returns `ChorusError::NotFound` when neither matches.
    pub fn resolve(&self, id_or_name: &str) -> Result<&Persona> {
        self.find(id_or_name)
            .or_else(|| self.find_by_name(id_or_name))
            .ok_or_else(|| ChorusError::not_found("persona", id_or_name))
    }

    /// Personas that are not yet part of the given participant set.
    pub fn available_for<'a>(&'a self, participants: &[Persona]) -> Vec<&'a Persona> {
        self.personas
            .iter()
            .filter(|p| !participants.iter().any(|q| q.id == p.id))
            .collect()
    }

    /// The first `n` personas, used as the starting participants of a new conversation.
    pub fn initial_participants(&self, n: usize) -> Vec<Persona> {
        self.personas.iter().take(n).cloned().collect()
    }
}

impl Default for PersonaRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
