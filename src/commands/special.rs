//! Special commands parser for interactive chat mode
//!
//! This module parses special commands that can be entered during an
//! interactive chat session. Special commands let users:
//! - Start, list, and switch sessions without leaving the loop
//! - Rename the current session
//! - Inspect or change the knowledge base replies draw from
//! - Display help information
//! - Exit the session
//!
//! Commands are prefixed with `/` and are case-insensitive; arguments
//! keep their original casing.

use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// Special commands that can be executed during interactive chat
///
/// These commands act on local session state or provide information,
/// rather than being sent to the server as a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Start a fresh session and make it active
    NewSession,

    /// List stored sessions
    ListSessions,

    /// Switch to another stored session
    SwitchSession(String),

    /// Show the active knowledge base, or switch to another one
    ///
    /// `None` shows the current base; `Some(id)` switches to it.
    KnowledgeBase(Option<String>),

    /// Rename the active session
    SetTitle(String),

    /// Display help information
    Help,

    /// Exit the interactive session
    Exit,

    /// Not a special command
    ///
    /// The input should be sent to the server as a chat message.
    None,
}

/// Parse a user input string into a special command
///
/// Command words are case-insensitive; arguments are taken verbatim
/// from the input so titles keep their casing.
///
/// # Errors
///
/// Returns `CommandError::UnknownCommand` if input starts with "/" but
/// is not a valid command, and `CommandError::MissingArgument` if a
/// command requires an argument but none was provided.
///
/// # Examples
///
/// ```
/// use qachat::commands::special::{parse_special_command, SpecialCommand};
///
/// let cmd = parse_special_command("/new").unwrap();
/// assert_eq!(cmd, SpecialCommand::NewSession);
///
/// let cmd = parse_special_command("what is a borrow checker?").unwrap();
/// assert_eq!(cmd, SpecialCommand::None);
///
/// // Invalid command returns error
/// assert!(parse_special_command("/foo").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    // If input doesn't start with "/", it's not a command (except exit/quit)
    if !trimmed.starts_with('/') && lower != "exit" && lower != "quit" {
        return Ok(SpecialCommand::None);
    }

    match lower.as_str() {
        // Session management
        "/new" => Ok(SpecialCommand::NewSession),
        "/sessions" => Ok(SpecialCommand::ListSessions),

        "/switch" => Err(CommandError::MissingArgument {
            command: "/switch".to_string(),
            usage: "/switch <session_id>".to_string(),
        }),
        // Command prefixes are ASCII, so slicing the original input at
        // the prefix length is safe and preserves argument casing.
        _ if lower.starts_with("/switch ") => {
            let id = trimmed[8..].trim();
            Ok(SpecialCommand::SwitchSession(id.to_string()))
        }

        "/title" => Err(CommandError::MissingArgument {
            command: "/title".to_string(),
            usage: "/title <text>".to_string(),
        }),
        _ if lower.starts_with("/title ") => {
            let text = trimmed[7..].trim();
            Ok(SpecialCommand::SetTitle(text.to_string()))
        }

        // Knowledge base inspection and switching
        "/kb" => Ok(SpecialCommand::KnowledgeBase(None)),
        _ if lower.starts_with("/kb ") => {
            let id = trimmed[4..].trim();
            Ok(SpecialCommand::KnowledgeBase(Some(id.to_string())))
        }

        // Help
        "/help" | "/?" => Ok(SpecialCommand::Help),

        // Exit commands
        "exit" | "quit" | "/exit" | "/quit" => Ok(SpecialCommand::Exit),

        // Unknown command starting with "/"
        _ if lower.starts_with('/') => {
            let cmd = trimmed.split_whitespace().next().unwrap_or(trimmed);
            Err(CommandError::UnknownCommand(cmd.to_string()))
        }

        // Not a special command
        _ => Ok(SpecialCommand::None),
    }
}

/// Display help text for special commands
pub fn print_help() {
    println!(
        r#"
Special Commands for Interactive Chat
=====================================

SESSION MANAGEMENT:
  /new            - Start a fresh session and switch to it
  /sessions       - List stored sessions
  /switch <id>    - Switch to another session
  /title <text>   - Rename the current session

KNOWLEDGE BASES:
  /kb             - Show the knowledge base replies draw from
  /kb <id>        - Query a different knowledge base

INFORMATION:
  /help           - Show this help message
  /?              - Same as /help

SESSION CONTROL:
  exit            - Leave chat
  quit            - Same as exit

NOTES:
  - Commands are case-insensitive
  - Regular text (not starting with /) is sent as a chat message
  - Replies stream in as the server produces them
  - Everything is stored locally; deleting is done via 'qachat sessions'
"#
    );
}
