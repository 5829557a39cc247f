//! Mention-based responder selection.
//!
//! Pure and deterministic: no I/O, same input always yields the same personas.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::persona::Persona;

/// Token addressing every participant.
pub const ALL_TOKEN: &str = "@all";

static MENTION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@(\w+)").expect("mention pattern is a valid regex"));

/// Selects the personas that must respond to `text`.
///
/// 1. Participants whose `@name` appears in the text (case-insensitive), in
///    participant order rather than text order.
/// 2. Otherwise every participant if the text contains `@all`.
/// 3. Otherwise the first participant.
///
/// Returns an empty list only when there are no participants.
pub fn route_by_mention(text: &str, participants: &[Persona]) -> Vec<Persona> {
    let lowered = text.to_lowercase();

    let mentioned: Vec<Persona> = participants
        .iter()
        .filter(|p| lowered.contains(&p.mention_token()))
        .cloned()
        .collect();
    if !mentioned.is_empty() {
        return mentioned;
    }

    if lowered.contains(ALL_TOKEN) {
        return participants.to_vec();
    }

    participants.first().cloned().into_iter().collect()
}

/// True when the text contains any `@word` token, valid persona or not.
pub fn contains_mention(text: &str) -> bool {
    MENTION_PATTERN.is_match(text)
}

/// Prepares outgoing human text for routing: trims it and appends ` @all`
/// when it carries no mention at all.
pub fn normalize_outgoing(text: &str) -> String {
    let trimmed = text.trim();
    if contains_mention(trimmed) {
        trimmed.to_string()
    } else {
        format!("{trimmed} {ALL_TOKEN}")
    }
}
