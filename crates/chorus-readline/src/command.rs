//! REPL command parsing.

/// One line of REPL input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Plain text, sent to the conversation as a human message.
    Say(String),
    Add(String),
    Remove(String),
    Participants,
    Personas,
    SelfEngageOn(Option<usize>),
    SelfEngageOff,
    Budget(usize),
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Unknown command: {0} (type /help)")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),
}

/// Commands offered for completion, in help order.
pub const COMMANDS: &[&str] = &[
    "/add",
    "/remove",
    "/participants",
    "/personas",
    "/selfengage on",
    "/selfengage off",
    "/budget",
    "/help",
    "/quit",
];

pub const HELP: &str = "\
  <text>                   send a message (@name to address a persona, @all for everyone)
  /add <persona>           add a persona to the conversation
  /remove <persona>        remove a participant
  /participants            list participants
  /personas                list all personas
  /selfengage on [budget]  let the personas talk among themselves
  /selfengage off          stop after the current run
  /budget <n>              messages per self-engagement run
  /quit                    exit";

/// Parses a trimmed, non-empty input line.
pub fn parse(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    if line == "quit" || line == "exit" {
        return Ok(Command::Quit);
    }
    if !line.starts_with('/') {
        return Ok(Command::Say(line.to_string()));
    }

    let mut words = line.split_whitespace();
    let name = words.next().unwrap_or_default();
    let args: Vec<&str> = words.collect();

    match (name, args.as_slice()) {
        ("/add", [persona]) => Ok(Command::Add(persona.to_string())),
        ("/add", _) => Err(CommandError::Usage("/add <persona>")),
        ("/remove", [persona]) => Ok(Command::Remove(persona.to_string())),
        ("/remove", _) => Err(CommandError::Usage("/remove <persona>")),
        ("/participants", []) => Ok(Command::Participants),
        ("/personas", []) => Ok(Command::Personas),
        ("/selfengage", ["on"]) => Ok(Command::SelfEngageOn(None)),
        ("/selfengage", ["on", budget]) => parse_count(budget, "/selfengage on [budget]")
            .map(|n| Command::SelfEngageOn(Some(n))),
        ("/selfengage", ["off"]) => Ok(Command::SelfEngageOff),
        ("/selfengage", _) => Err(CommandError::Usage("/selfengage on [budget] | off")),
        ("/budget", [n]) => parse_count(n, "/budget <n>").map(Command::Budget),
        ("/budget", _) => Err(CommandError::Usage("/budget <n>")),
        ("/help", _) => Ok(Command::Help),
        ("/quit" | "/exit", _) => Ok(Command::Quit),
        _ => Err(CommandError::Unknown(name.to_string())),
    }
}

fn parse_count(raw: &str, usage: &'static str) -> Result<usize, CommandError> {
    raw.parse().map_err(|_| CommandError::Usage(usage))
}
