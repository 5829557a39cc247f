//! Terminal rendering of conversation events and diagnostics.

use colored::{ColoredString, Colorize};

use chorus_core::conversation::{ConversationEvent, Message};
use chorus_core::engagement::StopReason;
use chorus_core::persona::{Persona, PersonaRegistry};
use chorus_execution::DiagnosticEvent;

/// Parses `#rrggbb` into an RGB triple.
pub fn hex_to_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

fn paint(text: &str, color: &str) -> ColoredString {
    match hex_to_rgb(color) {
        Some((r, g, b)) => text.truecolor(r, g, b).bold(),
        None => text.bright_magenta().bold(),
    }
}

/// `🤖 assistant` in the persona's color.
pub fn persona_label(persona: &Persona) -> String {
    format!("{} {}", persona.avatar, paint(&persona.name, &persona.color))
}

fn render_message(message: &Message, registry: &PersonaRegistry) -> String {
    match message.persona_id() {
        None => format!("> {}", message.content()).green().to_string(),
        Some(id) => {
            let header = registry
                .find(id)
                .map(persona_label)
                .unwrap_or_else(|| format!("[{}]", id).bright_magenta().to_string());
            let body = message
                .content()
                .lines()
                .map(|line| format!("  {line}"))
                .collect::<Vec<_>>()
                .join("\n");
            format!("{header}\n{body}\n")
        }
    }
}

fn describe_stop(reason: StopReason) -> &'static str {
    match reason {
        StopReason::BudgetReached => "message budget reached",
        StopReason::NoResponders => "nobody else wanted to respond",
        StopReason::EmptyHistory => "nothing to respond to",
        StopReason::AlreadyRunning => "a run was already active",
        StopReason::Busy => "replies to the last message were still pending",
    }
}

/// Text for one conversation event.
pub fn render_event(event: &ConversationEvent, registry: &PersonaRegistry) -> String {
    match event {
        ConversationEvent::MessageAppended { message } => render_message(message, registry),
        ConversationEvent::ParticipantAdded { persona } => {
            format!("{} {}", persona_label(persona), "joined".bright_black())
        }
        ConversationEvent::ParticipantRemoved { persona } => {
            format!("{} {}", persona_label(persona), "left".bright_black())
        }
        ConversationEvent::SelfEngagementToggled { enabled } => {
            let state = if *enabled { "on" } else { "off" };
            format!("Self-engagement {state}").yellow().to_string()
        }
        ConversationEvent::SelfEngagementStarted { budget } => {
            format!("── personas are talking (up to {budget} messages) ──")
                .bright_black()
                .to_string()
        }
        ConversationEvent::SelfEngagementFinished { produced, reason } => format!(
            "── {produced} message(s), {} ──",
            describe_stop(*reason)
        )
        .bright_black()
        .to_string(),
    }
}

/// Text for a diagnostic: warnings, and the decider's choices.
pub fn render_diagnostic(event: &DiagnosticEvent) -> Option<String> {
    if event.is_warning() {
        let detail = event
            .fields
            .get("error")
            .map(|e| format!(" ({})", e.as_str().unwrap_or_default()))
            .unwrap_or_default();
        return Some(format!("! {}{}", event.message, detail).yellow().to_string());
    }

    if event.target == "chorus::inference" {
        let decision = event.fields.get("decision")?.as_str()?;
        return Some(format!("  next: {decision}").bright_black().to_string());
    }

    None
}
