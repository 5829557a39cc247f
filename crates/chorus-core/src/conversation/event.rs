use serde::Serialize;

use super::message::Message;
use crate::engagement::StopReason;
use crate::persona::Persona;

/// Notifications published to conversation observers (e.g. the UI).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationEvent {
    /// A message was appended to the history.
    MessageAppended { message: Message },
    /// A persona joined the conversation.
    ParticipantAdded { persona: Persona },
    /// A persona left the conversation.
    ParticipantRemoved { persona: Persona },
    /// The standing self-engagement flag changed.
    SelfEngagementToggled { enabled: bool },
    /// An autonomous run started.
    SelfEngagementStarted { budget: usize },
    /// An autonomous run left the loop.
    SelfEngagementFinished { produced: usize, reason: StopReason },
}

/// Receives conversation events.
///
/// Observers are invoked synchronously on the task that caused the event.
/// `ConversationState` calls them during the mutation itself, so anything
/// holding a lock around the state must not let an observer wait on that
/// lock. The orchestrator queues events and delivers them after its state
/// lock is released. Observers must not block either way.
pub trait ConversationObserver: Send + Sync {
    fn on_event(&self, event: &ConversationEvent);
}

impl<F> ConversationObserver for F
where
    F: Fn(&ConversationEvent) + Send + Sync,
{
    fn on_event(&self, event: &ConversationEvent) {
        self(event)
    }
}
