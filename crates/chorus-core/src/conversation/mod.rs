//! Conversation domain module.
//!
//! - `message`: the human/ai message sum type
//! - `model`: the `Conversation` record (history + participants)
//! - `state`: `ConversationState`, the owned mutable state with observers
//! - `event`: observer notifications

mod event;
mod message;
mod model;
mod state;

pub use event::{ConversationEvent, ConversationObserver};
pub use message::{Message, MessageRole};
pub use model::{Conversation, DEFAULT_TITLE};
pub use state::ConversationState;
