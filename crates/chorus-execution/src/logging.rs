//! Tracing subscriber setup.
//!
//! Priority of the console filter: `RUST_LOG` env var > configured level.
//! Console output goes to stderr so it never interleaves with REPL replies
//! on stdout.

use tokio::sync::mpsc;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::tracing_layer::{DiagnosticEvent, DiagnosticsLayer};

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Invalid log filter '{filter}': {source}")]
    InvalidFilter {
        filter: String,
        #[source]
        source: ParseError,
    },

    #[error("Tracing subscriber already installed: {0}")]
    AlreadyInitialized(#[from] TryInitError),
}

/// Console logging options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Level or `EnvFilter` directives, e.g. `info` or `warn,chorus=debug`.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
    /// Install the stderr console layer at all.
    pub console: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            console: true,
        }
    }
}

/// Directives used when `RUST_LOG` is not set. HTTP plumbing stays quiet.
pub fn default_directives(level: &str) -> String {
    format!("{level},hyper=warn,hyper_util=warn,reqwest=warn,rustyline=warn")
}

fn parse_directives(directives: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(directives).map_err(|source| LoggingError::InvalidFilter {
        filter: directives.to_string(),
        source,
    })
}

fn console_filter(config: &LogConfig) -> Result<EnvFilter, LoggingError> {
    match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.trim().is_empty() => parse_directives(&directives),
        _ => parse_directives(&default_directives(&config.level)),
    }
}

fn console_layer(json: bool) -> Box<dyn Layer<Registry> + Send + Sync> {
    if json {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        fmt::layer().with_writer(std::io::stderr).boxed()
    }
}

/// Installs the global subscriber.
///
/// The console layer writes to stderr when `config.console` is set. With a
/// `diagnostics` sender, Chorus events at INFO and above are also
/// forwarded as [`DiagnosticEvent`]s regardless of the console level.
///
/// # Errors
///
/// Fails on invalid filter directives or when a subscriber is already set.
pub fn init_tracing(
    config: &LogConfig,
    diagnostics: Option<mpsc::UnboundedSender<DiagnosticEvent>>,
) -> Result<(), LoggingError> {
    let console = if config.console {
        Some(console_layer(config.json).with_filter(console_filter(config)?))
    } else {
        None
    };

    let diagnostics = diagnostics
        .map(|sender| DiagnosticsLayer::new(sender).with_filter(DiagnosticsLayer::default_filter()));

    tracing_subscriber::registry()
        .with(console)
        .with(diagnostics)
        .try_init()?;

    Ok(())
}
