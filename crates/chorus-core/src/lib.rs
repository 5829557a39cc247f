//! Domain layer of Chorus: personas, conversations, mention routing and
//! self-engagement types.

pub mod conversation;
pub mod engagement;
pub mod error;
pub mod persona;
pub mod routing;

// Re-export common error type
pub use error::ChorusError;
