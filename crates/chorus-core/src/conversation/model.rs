//! Conversation domain model.

use super::message::Message;
use crate::persona::Persona;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default title for a fresh conversation.
pub const DEFAULT_TITLE: &str = "New Conversation";

/// One chat thread: ordered message history plus the personas taking part.
///
/// Messages are append-only and their insertion order is the only order.
/// Participants are unique by id and kept in the order they were added.
/// Mutation goes through [`super::ConversationState`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub(crate) messages: Vec<Message>,
    pub(crate) participants: Vec<Persona>,
}

impl Conversation {
    /// Creates an empty conversation with the given starting participants.
    ///
    /// Duplicate personas (by id) are dropped, keeping the first occurrence.
    pub fn new(title: impl Into<String>, participants: Vec<Persona>) -> Self {
        let mut unique: Vec<Persona> = Vec::with_capacity(participants.len());
        for persona in participants {
            if !unique.iter().any(|p| p.id == persona.id) {
                unique.push(persona);
            }
        }

        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            messages: Vec::new(),
            participants: unique,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn participants(&self) -> &[Persona] {
        &self.participants
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn participant(&self, persona_id: &str) -> Option<&Persona> {
        self.participants.iter().find(|p| p.id == persona_id)
    }

    pub fn is_participant(&self, persona_id: &str) -> bool {
        self.participant(persona_id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::get_default_presets;

    #[test]
    fn test_new_deduplicates_participants() {
        let presets = get_default_presets();
        let conversation = Conversation::new(
            DEFAULT_TITLE,
            vec![presets[0].clone(), presets[1].clone(), presets[0].clone()],
        );
        assert_eq!(conversation.participants().len(), 2);
        assert_eq!(conversation.participants()[0].id, "ai-assistant");
        assert!(conversation.messages().is_empty());
        assert!(conversation.last_message().is_none());
    }
}
