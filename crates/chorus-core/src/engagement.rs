//! Self-engagement run types.

use serde::{Deserialize, Serialize};

use crate::error::{ChorusError, Result};

/// Minimum number of participants required to enable self-engagement.
pub const MIN_SELF_ENGAGE_PARTICIPANTS: usize = 2;

/// Default message budget for one autonomous run.
pub const DEFAULT_MAX_MESSAGES: usize = 10;

/// Routing input used when an autonomous round starts with an empty history.
pub const CONTINUE_PLACEHOLDER: &str = "Continue the conversation";

/// User-configured limits of an autonomous run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelfEngagementConfig {
    /// Maximum number of turns a single run takes (at least 1).
    pub max_messages: usize,
}

impl SelfEngagementConfig {
    /// # Errors
    ///
    /// Returns `InvalidBudget` when `max_messages` is zero.
    pub fn new(max_messages: usize) -> Result<Self> {
        if max_messages == 0 {
            return Err(ChorusError::InvalidBudget(max_messages));
        }
        Ok(Self { max_messages })
    }
}

impl Default for SelfEngagementConfig {
    fn default() -> Self {
        Self {
            max_messages: DEFAULT_MAX_MESSAGES,
        }
    }
}

/// What the inference router does when its decision call fails.
///
/// A failed decision is indistinguishable from "nobody should answer" unless
/// this is decided explicitly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionFailurePolicy {
    /// Route the last message with the mention rules instead (keeps a run alive).
    #[default]
    #[serde(rename = "fallback")]
    FallbackToMentions,
    /// Select nobody, which ends a self-engagement run.
    #[serde(rename = "end")]
    EndConversation,
}

/// Why a self-engagement run stopped (or never started).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The run took `max_messages` turns.
    BudgetReached,
    /// The decision step selected nobody: natural end of the conversation.
    NoResponders,
    /// Refused: there was nothing to respond to.
    EmptyHistory,
    /// Refused: another run is already active for this conversation.
    AlreadyRunning,
    /// Refused: a direct reply batch is still waiting on responses.
    Busy,
}

impl StopReason {
    /// Whether a run actually executed (as opposed to being refused up front).
    pub fn ran(&self) -> bool {
        matches!(self, Self::BudgetReached | Self::NoResponders)
    }
}

/// Outcome of one autonomous run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Number of AI messages appended by this run.
    pub produced: usize,
    pub reason: StopReason,
}

impl RunReport {
    pub fn refused(reason: StopReason) -> Self {
        Self {
            produced: 0,
            reason,
        }
    }
}
