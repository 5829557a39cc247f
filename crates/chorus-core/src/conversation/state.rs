//! Owned, observable conversation state.

use std::sync::Arc;

use super::event::{ConversationEvent, ConversationObserver};
use super::message::Message;
use super::model::Conversation;
use crate::error::{ChorusError, Result};
use crate::persona::Persona;

/// The mutable record of participants and message history.
///
/// This is the only place a [`Conversation`] is mutated. Every mutation is
/// published to the registered observers after it has been applied.
pub struct ConversationState {
    conversation: Conversation,
    observers: Vec<Arc<dyn ConversationObserver>>,
}

impl ConversationState {
    pub fn new(conversation: Conversation) -> Self {
        Self {
            conversation,
            observers: Vec::new(),
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn messages(&self) -> &[Message] {
        self.conversation.messages()
    }

    pub fn participants(&self) -> &[Persona] {
        self.conversation.participants()
    }

    /// Registers an observer for all subsequent events.
    pub fn subscribe(&mut self, observer: Arc<dyn ConversationObserver>) {
        self.observers.push(observer);
    }

    fn notify(&self, event: ConversationEvent) {
        for observer in &self.observers {
            observer.on_event(&event);
        }
    }

    /// Appends a message to the end of the history.
    ///
    /// A timestamp earlier than the current last message is raised to it, so
    /// timestamps stay non-decreasing in append order.
    ///
    /// # Errors
    ///
    /// - `DuplicateMessageId` if the id is already present
    /// - `NotFound` if an AI message names a persona that is not a participant
    pub fn append_message(&mut self, mut message: Message) -> Result<&Message> {
        if self
            .conversation
            .messages
            .iter()
            .any(|m| m.id() == message.id())
        {
            return Err(ChorusError::DuplicateMessageId(message.id().to_string()));
        }

        match &message {
            Message::Human { .. } => {}
            Message::Ai { persona_id, .. } => {
                if !self.conversation.is_participant(persona_id) {
                    return Err(ChorusError::not_found("participant", persona_id.clone()));
                }
            }
        }

        if let Some(last) = self.conversation.last_message() {
            if message.timestamp() < last.timestamp() {
                message.set_timestamp(last.timestamp());
            }
        }

        self.conversation.messages.push(message.clone());
        self.notify(ConversationEvent::MessageAppended { message });

        let appended = self
            .conversation
            .messages
            .last()
            .ok_or_else(|| ChorusError::internal("message vanished after append"))?;
        Ok(appended)
    }

    /// Adds a persona at the end of the participant list.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyParticipant` if a persona with the same id is present.
    pub fn add_participant(&mut self, persona: Persona) -> Result<()> {
        if self.conversation.is_participant(&persona.id) {
            return Err(ChorusError::AlreadyParticipant(persona.name));
        }

        self.conversation.participants.push(persona.clone());
        self.notify(ConversationEvent::ParticipantAdded { persona });
        Ok(())
    }

    /// Removes a persona from the participant list, preserving the order of the rest.
    ///
    /// Messages previously authored by the persona stay in the history.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the persona is not a participant
    /// - `LastParticipant` if it is the only one left
    pub fn remove_participant(&mut self, persona_id: &str) -> Result<Persona> {
        let index = self
            .conversation
            .participants
            .iter()
            .position(|p| p.id == persona_id)
            .ok_or_else(|| ChorusError::not_found("participant", persona_id))?;

        if self.conversation.participants.len() == 1 {
            return Err(ChorusError::LastParticipant(
                self.conversation.participants[index].name.clone(),
            ));
        }

        let persona = self.conversation.participants.remove(index);
        self.notify(ConversationEvent::ParticipantRemoved {
            persona: persona.clone(),
        });
        Ok(persona)
    }
}

impl std::fmt::Debug for ConversationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationState")
            .field("conversation", &self.conversation)
            .field("observers", &self.observers.len())
            .finish()
    }
}
