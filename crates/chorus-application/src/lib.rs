//! Application layer of Chorus.
//!
//! Wires the domain types from `chorus-core` to the responder and inference
//! router from `chorus-interaction`.

pub mod orchestrator;
pub mod pacing;

pub use orchestrator::{ConversationOrchestrator, EnableOutcome, TurnOutcome};
pub use pacing::{NoPacing, PacingPolicy, RandomPacing};
