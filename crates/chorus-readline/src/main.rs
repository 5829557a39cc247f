mod command;
mod display;

use std::borrow::Cow::{self, Borrowed, Owned};
use std::sync::Arc;

use anyhow::{Result, anyhow};
use colored::Colorize;
use rustyline::Editor;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};
use tokio::sync::mpsc;

use chorus_application::{ConversationOrchestrator, EnableOutcome, RandomPacing, TurnOutcome};
use chorus_core::conversation::{Conversation, ConversationEvent, DEFAULT_TITLE};
use chorus_core::engagement::{MIN_SELF_ENGAGE_PARTICIPANTS, SelfEngagementConfig};
use chorus_core::persona::PersonaRegistry;
use chorus_execution::{DiagnosticEvent, LogConfig, init_tracing};
use chorus_infrastructure::config_service::API_KEY_ENV;
use chorus_infrastructure::{ConfigService, RootConfig, persona_registry, resolve_api_key};
use chorus_interaction::{
    ClaudeApiProvider, CompletionProvider, DeciderConfig, InferenceRouter, ProviderResponder,
};

use command::{COMMANDS, Command, HELP};

/// CLI helper for rustyline that provides completion, highlighting, and hints.
#[derive(Clone)]
struct CliHelper {
    commands: Vec<String>,
    persona_names: Vec<String>,
}

impl CliHelper {
    fn new(registry: &PersonaRegistry) -> Self {
        Self {
            commands: COMMANDS.iter().map(|c| c.to_string()).collect(),
            persona_names: registry.all().iter().map(|p| p.name.clone()).collect(),
        }
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];

        // Persona names after /add and /remove
        if let Some(partial) = line
            .strip_prefix("/add ")
            .or_else(|| line.strip_prefix("/remove "))
        {
            let start = pos - partial.len();
            let candidates = self
                .persona_names
                .iter()
                .filter(|name| name.starts_with(partial))
                .map(|name| Pair {
                    display: name.clone(),
                    replacement: name.clone(),
                })
                .collect();
            return Ok((start, candidates));
        }

        if line.starts_with('/') {
            let candidates: Vec<Pair> = self
                .commands
                .iter()
                .filter(|cmd| cmd.starts_with(line))
                .map(|cmd| Pair {
                    display: cmd.clone(),
                    replacement: cmd.clone(),
                })
                .collect();
            Ok((0, candidates))
        } else {
            Ok((0, vec![]))
        }
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            self.commands
                .iter()
                .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for CliHelper {}

fn build_orchestrator(
    config: &RootConfig,
    registry: Arc<PersonaRegistry>,
    api_key: String,
) -> Result<ConversationOrchestrator> {
    let mut provider = ClaudeApiProvider::new(api_key);
    if let Some(base_url) = &config.anthropic.base_url {
        provider = provider.with_base_url(base_url.clone());
    }
    let provider: Arc<dyn CompletionProvider> = Arc::new(provider);

    let responder = ProviderResponder::new(provider.clone())
        .with_temperature(config.completion.temperature)
        .with_max_tokens(config.completion.max_tokens);
    let router = InferenceRouter::new(
        provider,
        DeciderConfig {
            model: config.decider.model.clone(),
            temperature: config.decider.temperature,
            on_failure: config.decider.on_failure,
        },
    );
    let pacing = RandomPacing::from_millis(
        config.pacing.min_delay_ms,
        config.pacing.max_delay_ms,
        config.pacing.start_delay_ms,
    );

    let conversation = Conversation::new(
        DEFAULT_TITLE,
        registry.initial_participants(MIN_SELF_ENGAGE_PARTICIPANTS),
    );

    Ok(ConversationOrchestrator::new(
        conversation,
        registry,
        Arc::new(responder),
        Arc::new(router),
    )
    .with_pacing(Arc::new(pacing))
    .with_config(SelfEngagementConfig::new(
        config.self_engagement.max_messages,
    )?))
}

/// Prints conversation events and diagnostics as they arrive.
async fn display_loop(
    mut events: mpsc::UnboundedReceiver<ConversationEvent>,
    mut diagnostics: mpsc::UnboundedReceiver<DiagnosticEvent>,
    registry: Arc<PersonaRegistry>,
) {
    loop {
        tokio::select! {
            Some(event) = events.recv() => {
                println!("{}", display::render_event(&event, &registry));
            }
            Some(diagnostic) = diagnostics.recv() => {
                if let Some(line) = display::render_diagnostic(&diagnostic) {
                    println!("{line}");
                }
            }
            else => break,
        }
    }
}

fn report_error(err: impl std::fmt::Display) {
    eprintln!("{}", format!("Error: {}", err).red());
}

async fn print_participants(orchestrator: &ConversationOrchestrator) {
    for persona in orchestrator.participants().await {
        println!(
            "  {}  {}",
            display::persona_label(&persona),
            persona.instructions_summary().bright_black()
        );
    }
}

async fn print_personas(orchestrator: &ConversationOrchestrator) {
    let participants = orchestrator.participants().await;
    let available = orchestrator.registry().available_for(&participants);
    for persona in orchestrator.registry().all() {
        let marker = if available.iter().any(|p| p.id == persona.id) {
            " "
        } else {
            "*"
        };
        println!(
            "{} {} {}",
            marker,
            display::persona_label(persona),
            format!("({})", persona.id).bright_black()
        );
    }
}

fn spawn_enable(orchestrator: Arc<ConversationOrchestrator>, budget: Option<usize>) {
    tokio::spawn(async move {
        match orchestrator.enable_self_engagement(budget).await {
            Ok(EnableOutcome::Armed) => println!(
                "{}",
                format!(
                    "Send a message to start (budget {}).",
                    orchestrator.budget()
                )
                .bright_black()
            ),
            Ok(EnableOutcome::AlreadyRunning) => {
                println!("{}", "A self-engagement run is already active.".yellow())
            }
            Ok(EnableOutcome::Ran(_)) => {}
            Err(e) => report_error(e),
        }
    });
}

fn spawn_send(orchestrator: Arc<ConversationOrchestrator>, text: String) {
    tokio::spawn(async move {
        match orchestrator.send_message(&text).await {
            Ok(TurnOutcome::Direct { responses }) if responses.is_empty() => {
                println!("{}", "No one responded.".bright_black())
            }
            Ok(_) => {}
            Err(e) => report_error(e),
        }
    });
}

/// The main entry point for the Chorus REPL.
///
/// Loads `~/.config/chorus/config.toml`, wires the Claude provider into a
/// conversation orchestrator and reads lines until `/quit`. Conversation
/// events are rendered by a background task so replies from a
/// self-engagement run appear while the prompt stays usable.
#[tokio::main]
async fn main() -> Result<()> {
    // ===== Configuration & logging =====
    let config_service = ConfigService::new()?;
    let config = config_service.get_config()?;

    let (diagnostic_tx, diagnostic_rx) = mpsc::unbounded_channel();
    init_tracing(
        &LogConfig {
            level: config.logging.level.clone(),
            json: config.logging.json,
            console: config.logging.console,
        },
        Some(diagnostic_tx),
    )?;

    let api_key = resolve_api_key(&config).ok_or_else(|| {
        anyhow!(
            "No Anthropic API key: set {} or [anthropic] api_key in {}",
            API_KEY_ENV,
            config_service.path().display()
        )
    })?;

    // ===== Backend Initialization =====
    let registry = Arc::new(persona_registry(&config)?);
    let orchestrator = Arc::new(build_orchestrator(&config, registry.clone(), api_key)?);

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    orchestrator.subscribe(Arc::new(move |event: &ConversationEvent| {
        let _ = event_tx.send(event.clone());
    }));
    let display_task = tokio::spawn(display_loop(event_rx, diagnostic_rx, registry.clone()));

    // ===== REPL Setup =====
    let mut rl: Editor<CliHelper, DefaultHistory> = Editor::new()?;
    rl.set_helper(Some(CliHelper::new(&registry)));

    println!("{}", "=== Chorus ===".bright_magenta().bold());
    println!(
        "{}",
        "Talk to the personas below. /help lists commands, /quit exits.".bright_black()
    );
    print_participants(&orchestrator).await;
    println!();

    // ===== Main REPL Loop =====
    loop {
        let readline = rl.readline(">> ");

        match readline {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);

                let command = match command::parse(trimmed) {
                    Ok(command) => command,
                    Err(e) => {
                        println!("{}", e.to_string().yellow());
                        continue;
                    }
                };

                match command {
                    Command::Say(text) => spawn_send(orchestrator.clone(), text),
                    Command::Add(persona) => {
                        if let Err(e) = orchestrator.add_participant(&persona).await {
                            report_error(e);
                        }
                    }
                    Command::Remove(persona) => {
                        if let Err(e) = orchestrator.remove_participant(&persona).await {
                            report_error(e);
                        }
                    }
                    Command::Participants => print_participants(&orchestrator).await,
                    Command::Personas => print_personas(&orchestrator).await,
                    Command::SelfEngageOn(budget) => spawn_enable(orchestrator.clone(), budget),
                    Command::SelfEngageOff => orchestrator.disable_self_engagement().await,
                    Command::Budget(n) => match orchestrator.set_budget(n) {
                        Ok(()) => println!("{}", format!("Budget set to {n}.").bright_black()),
                        Err(e) => report_error(e),
                    },
                    Command::Help => println!("{}", HELP.bright_black()),
                    Command::Quit => {
                        println!("{}", "Goodbye!".bright_green());
                        break;
                    }
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type /quit to exit.".yellow());
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                report_error(format!("{:?}", err));
                break;
            }
        }
    }

    display_task.abort();
    Ok(())
}
