//! Conversation message types.
//!
//! A message is either authored by the human or by one of the AI personas.
//! The variant is the discriminant; anything that depends on who wrote a
//! message must match on it exhaustively.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    /// Message typed by the human user.
    Human,
    /// Message generated on behalf of a persona.
    Ai,
}

/// A single message in a conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    Human {
        id: String,
        content: String,
        timestamp: DateTime<Utc>,
    },
    Ai {
        id: String,
        content: String,
        timestamp: DateTime<Utc>,
        /// Id of the persona that produced this message.
        persona_id: String,
    },
}

impl Message {
    /// Creates a human message with a fresh id, stamped now.
    pub fn human(content: impl Into<String>) -> Self {
        Self::Human {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Creates an AI message attributed to `persona_id`, with a fresh id, stamped now.
    pub fn ai(persona_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Ai {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            timestamp: Utc::now(),
            persona_id: persona_id.into(),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Human { id, .. } | Self::Ai { id, .. } => id,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Self::Human { content, .. } | Self::Ai { content, .. } => content,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Human { timestamp, .. } | Self::Ai { timestamp, .. } => *timestamp,
        }
    }

    pub fn role(&self) -> MessageRole {
        match self {
            Self::Human { .. } => MessageRole::Human,
            Self::Ai { .. } => MessageRole::Ai,
        }
    }

    /// The authoring persona, `None` for human messages.
    pub fn persona_id(&self) -> Option<&str> {
        match self {
            Self::Human { .. } => None,
            Self::Ai { persona_id, .. } => Some(persona_id),
        }
    }

    pub(crate) fn set_timestamp(&mut self, value: DateTime<Utc>) {
        match self {
            Self::Human { timestamp, .. } | Self::Ai { timestamp, .. } => *timestamp = value,
        }
    }
}
