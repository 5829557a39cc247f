//! Custom tracing layer for streaming orchestration events to the front end
//!
//! The REPL shows what the orchestrator is doing (run started, decider
//! fallback, dropped replies) without scraping log output. This layer turns
//! selected tracing events into [`DiagnosticEvent`]s and pushes them through
//! an unbounded tokio channel.

use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::Context;

/// Target prefix shared by all Chorus crates.
pub const CHORUS_TARGET: &str = "chorus";

/// Event data sent to the front end
#[derive(Debug, Clone, serde::Serialize)]
pub struct DiagnosticEvent {
    /// Event target (e.g., "chorus::engagement")
    pub target: String,
    /// Log level (INFO, WARN, ERROR, ...)
    #[serde(serialize_with = "serialize_level")]
    pub level: Level,
    /// Human-readable message
    pub message: String,
    /// Structured fields from the event, without the message
    pub fields: HashMap<String, Value>,
    pub timestamp: String,
}

impl DiagnosticEvent {
    pub fn is_warning(&self) -> bool {
        self.level == Level::WARN || self.level == Level::ERROR
    }
}

fn serialize_level<S: serde::Serializer>(level: &Level, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(level)
}

/// A tracing layer that sends events to a channel
pub struct DiagnosticsLayer {
    sender: mpsc::UnboundedSender<DiagnosticEvent>,
}

impl DiagnosticsLayer {
    pub fn new(sender: mpsc::UnboundedSender<DiagnosticEvent>) -> Self {
        Self { sender }
    }

    /// Per-layer filter: INFO and above from Chorus targets only.
    pub fn default_filter() -> Targets {
        Targets::new().with_target(CHORUS_TARGET, Level::INFO)
    }
}

impl<S> Layer<S> for DiagnosticsLayer
where
    S: Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = HashMap::new();
        let mut visitor = FieldVisitor(&mut fields);
        event.record(&mut visitor);

        let message = match fields.remove("message") {
            Some(Value::String(s)) => s,
            Some(other) => other.to_string(),
            None => String::new(),
        };

        let diagnostic = DiagnosticEvent {
            target: event.metadata().target().to_string(),
            level: *event.metadata().level(),
            message,
            fields,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        // Receiver gone means nobody is listening anymore
        let _ = self.sender.send(diagnostic);
    }
}

/// Field visitor that extracts tracing event fields into a HashMap
struct FieldVisitor<'a>(&'a mut HashMap<String, Value>);

impl tracing::field::Visit for FieldVisitor<'_> {
    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.0
            .insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0
            .insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0
            .insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0
            .insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0
            .insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.insert(
            field.name().to_string(),
            serde_json::json!(format!("{:?}", value)),
        );
    }
}
