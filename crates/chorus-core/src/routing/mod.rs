//! Responder selection that needs no external calls.

mod mention;

pub use mention::{ALL_TOKEN, contains_mention, normalize_outgoing, route_by_mention};
