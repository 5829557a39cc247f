//! Error types for the Chorus application.

use thiserror::Error;

/// A shared error type for the entire Chorus application.
///
/// Orchestrator policy rejections (too few participants, busy conversation, ...)
/// are ordinary variants here: none of them is fatal, the caller decides how to
/// surface them to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChorusError {
    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// The persona is already part of the conversation
    #[error("Persona '{0}' is already a participant")]
    AlreadyParticipant(String),

    /// The last remaining participant cannot be removed
    #[error("Cannot remove '{0}': a conversation needs at least one participant")]
    LastParticipant(String),

    /// Self-engagement requires more participants than are present
    #[error(
        "You need at least {required} AI participants for self-engagement (currently {actual}). Please add another AI."
    )]
    NotEnoughParticipants { required: usize, actual: usize },

    /// Message budget must be a positive integer
    #[error("Self-engagement message budget must be at least 1 (got {0})")]
    InvalidBudget(usize),

    /// Input was empty after trimming
    #[error("Message is empty")]
    EmptyInput,

    /// Another turn or self-engagement run is still being processed
    #[error("Conversation is busy: {0}")]
    Busy(String),

    /// A message with the same id already exists in the conversation
    #[error("Duplicate message id: {0}")]
    DuplicateMessageId(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChorusError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a Busy error
    pub fn busy(message: impl Into<String>) -> Self {
        Self::Busy(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a config error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Check if this error is a policy rejection that should be shown to the user
    /// as-is (as opposed to an infrastructure failure).
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::AlreadyParticipant(_)
                | Self::LastParticipant(_)
                | Self::NotEnoughParticipants { .. }
                | Self::InvalidBudget(_)
                | Self::EmptyInput
                | Self::Busy(_)
        )
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for ChorusError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for ChorusError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for ChorusError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, ChorusError>`.
pub type Result<T> = std::result::Result<T, ChorusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_enough_participants_message_is_explanatory() {
        let err = ChorusError::NotEnoughParticipants {
            required: 2,
            actual: 1,
        };
        assert!(err.to_string().contains("at least 2"));
        assert!(err.is_user_facing());
    }

    #[test]
    fn test_io_conversion() {
        let err: ChorusError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, ChorusError::Io { .. }));
        assert!(!err.is_user_facing());
    }

    #[test]
    fn test_toml_conversion() {
        let err: ChorusError = toml::from_str::<toml::Value>("= broken").unwrap_err().into();
        match err {
            ChorusError::Serialization { format, .. } => assert_eq!(format, "TOML"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
