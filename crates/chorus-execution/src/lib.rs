//! Runtime plumbing for Chorus: tracing subscriber setup and the diagnostics
//! layer that forwards orchestration events to the interactive front end.

pub mod logging;
pub mod tracing_layer;

pub use logging::{LogConfig, LoggingError, init_tracing};
pub use tracing_layer::{DiagnosticEvent, DiagnosticsLayer};
