//! Command-line interface definition for qachat
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for interactive chat, session management, and
//! knowledge base management.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// qachat - Terminal client for the QAChat RAG server
///
/// Chat against your knowledge bases with streamed replies, and manage
/// sessions, bases, and documents from the command line.
#[derive(Parser, Debug, Clone)]
#[command(name = "qachat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Directory for local chat and knowledge state
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for qachat
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start interactive chat mode
    Chat {
        /// Knowledge base to query (overrides the configured default)
        #[arg(short, long)]
        kb: Option<String>,

        /// Resume a specific session instead of the last active one
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Manage chat sessions
    Sessions {
        /// Session management subcommand
        #[command(subcommand)]
        command: SessionCommand,
    },

    /// Manage knowledge bases and their documents
    Kb {
        /// Knowledge base management subcommand
        #[command(subcommand)]
        command: KbCommand,
    },
}

/// Session management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SessionCommand {
    /// List stored chat sessions
    List,

    /// Delete a chat session
    Delete {
        /// Session id to delete
        #[arg(short, long)]
        id: String,
    },
}

/// Knowledge base management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum KbCommand {
    /// List knowledge bases
    List,

    /// Create a knowledge base on the server
    Create {
        /// Name of the new knowledge base
        #[arg(short, long)]
        name: String,

        /// Description of the new knowledge base
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// Delete an empty knowledge base
    Delete {
        /// Knowledge base id to delete
        #[arg(short, long)]
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// List documents in a knowledge base
    Docs {
        /// Knowledge base id
        #[arg(short, long)]
        id: String,
    },

    /// Upload a document into a knowledge base
    Upload {
        /// Knowledge base id
        #[arg(short, long)]
        kb: String,

        /// Path to the file to upload
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Remove a document from a knowledge base
    Remove {
        /// Knowledge base id
        #[arg(short, long)]
        kb: String,

        /// Document id to remove
        #[arg(short, long)]
        doc: String,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            data_dir: None,
            command: Commands::Chat {
                kb: None,
                session: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default() {
        let cli = Cli::default();
        assert_eq!(cli.config, Some("config/config.yaml".to_string()));
        assert!(!cli.verbose);
        assert!(cli.data_dir.is_none());

        if let Commands::Chat { kb, session } = cli.command {
            assert_eq!(kb, None);
            assert_eq!(session, None);
        } else {
            panic!("Expected default command to be Chat");
        }
    }

    #[test]
    fn test_cli_parse_chat_command() {
        let cli = Cli::try_parse_from(["qachat", "chat"]);
        assert!(cli.is_ok());
        let cli = cli.unwrap();
        assert!(matches!(cli.command, Commands::Chat { .. }));
    }

    #[test]
    fn test_cli_parse_chat_with_kb() {
        let cli = Cli::try_parse_from(["qachat", "chat", "--kb", "3"]);
        assert!(cli.is_ok());
        let cli = cli.unwrap();
        if let Commands::Chat { kb, session } = cli.command {
            assert_eq!(kb, Some("3".to_string()));
            assert_eq!(session, None);
        } else {
            panic!("Expected Chat command");
        }
    }

    #[test]
    fn test_cli_parse_chat_with_session() {
        let cli = Cli::try_parse_from(["qachat", "chat", "--session", "1700000000000"]);
        assert!(cli.is_ok());
        let cli = cli.unwrap();
        if let Commands::Chat { kb, session } = cli.command {
            assert_eq!(kb, None);
            assert_eq!(session, Some("1700000000000".to_string()));
        } else {
            panic!("Expected Chat command");
        }
    }

    #[test]
    fn test_cli_parse_sessions_list() {
        let cli = Cli::try_parse_from(["qachat", "sessions", "list"]);
        assert!(cli.is_ok());
        let cli = cli.unwrap();
        if let Commands::Sessions { command } = cli.command {
            assert!(matches!(command, SessionCommand::List));
        } else {
            panic!("Expected Sessions command");
        }
    }

    #[test]
    fn test_cli_parse_sessions_delete() {
        let cli = Cli::try_parse_from(["qachat", "sessions", "delete", "--id", "1700000000000"]);
        assert!(cli.is_ok());
        let cli = cli.unwrap();
        if let Commands::Sessions { command } = cli.command {
            if let SessionCommand::Delete { id } = command {
                assert_eq!(id, "1700000000000");
            } else {
                panic!("Expected Delete command");
            }
        } else {
            panic!("Expected Sessions command");
        }
    }

    #[test]
    fn test_cli_parse_kb_list() {
        let cli = Cli::try_parse_from(["qachat", "kb", "list"]);
        assert!(cli.is_ok());
        let cli = cli.unwrap();
        if let Commands::Kb { command } = cli.command {
            assert!(matches!(command, KbCommand::List));
        } else {
            panic!("Expected Kb command");
        }
    }

    #[test]
    fn test_cli_parse_kb_create() {
        let cli = Cli::try_parse_from([
            "qachat",
            "kb",
            "create",
            "--name",
            "docs",
            "--description",
            "Product documentation",
        ]);
        assert!(cli.is_ok());
        let cli = cli.unwrap();
        if let Commands::Kb { command } = cli.command {
            if let KbCommand::Create { name, description } = command {
                assert_eq!(name, "docs");
                assert_eq!(description, "Product documentation");
            } else {
                panic!("Expected Create command");
            }
        } else {
            panic!("Expected Kb command");
        }
    }

    #[test]
    fn test_cli_parse_kb_create_default_description() {
        let cli = Cli::try_parse_from(["qachat", "kb", "create", "--name", "docs"]);
        assert!(cli.is_ok());
        let cli = cli.unwrap();
        if let Commands::Kb {
            command: KbCommand::Create { name, description },
        } = cli.command
        {
            assert_eq!(name, "docs");
            assert_eq!(description, "");
        } else {
            panic!("Expected Kb create command");
        }
    }

    #[test]
    fn test_cli_parse_kb_delete() {
        let cli = Cli::try_parse_from(["qachat", "kb", "delete", "--id", "5"]);
        assert!(cli.is_ok());
        let cli = cli.unwrap();
        if let Commands::Kb {
            command: KbCommand::Delete { id, yes },
        } = cli.command
        {
            assert_eq!(id, "5");
            assert!(!yes);
        } else {
            panic!("Expected Kb delete command");
        }
    }

    #[test]
    fn test_cli_parse_kb_delete_with_yes() {
        let cli = Cli::try_parse_from(["qachat", "kb", "delete", "--id", "5", "--yes"]);
        assert!(cli.is_ok());
        let cli = cli.unwrap();
        if let Commands::Kb {
            command: KbCommand::Delete { id, yes },
        } = cli.command
        {
            assert_eq!(id, "5");
            assert!(yes);
        } else {
            panic!("Expected Kb delete command");
        }
    }

    #[test]
    fn test_cli_parse_kb_docs() {
        let cli = Cli::try_parse_from(["qachat", "kb", "docs", "--id", "0"]);
        assert!(cli.is_ok());
        let cli = cli.unwrap();
        if let Commands::Kb {
            command: KbCommand::Docs { id },
        } = cli.command
        {
            assert_eq!(id, "0");
        } else {
            panic!("Expected Kb docs command");
        }
    }

    #[test]
    fn test_cli_parse_kb_upload() {
        let cli = Cli::try_parse_from([
            "qachat", "kb", "upload", "--kb", "2", "--file", "notes.pdf",
        ]);
        assert!(cli.is_ok());
        let cli = cli.unwrap();
        if let Commands::Kb {
            command: KbCommand::Upload { kb, file },
        } = cli.command
        {
            assert_eq!(kb, "2");
            assert_eq!(file, PathBuf::from("notes.pdf"));
        } else {
            panic!("Expected Kb upload command");
        }
    }

    #[test]
    fn test_cli_parse_kb_remove() {
        let cli = Cli::try_parse_from([
            "qachat",
            "kb",
            "remove",
            "--kb",
            "2",
            "--doc",
            "1700000000001",
        ]);
        assert!(cli.is_ok());
        let cli = cli.unwrap();
        if let Commands::Kb {
            command: KbCommand::Remove { kb, doc },
        } = cli.command
        {
            assert_eq!(kb, "2");
            assert_eq!(doc, "1700000000001");
        } else {
            panic!("Expected Kb remove command");
        }
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::try_parse_from(["qachat", "--config", "custom.yaml", "kb", "list"]);
        assert!(cli.is_ok());
        let cli = cli.unwrap();
        assert_eq!(cli.config, Some("custom.yaml".to_string()));
    }

    #[test]
    fn test_cli_parse_with_verbose() {
        let cli = Cli::try_parse_from(["qachat", "-v", "sessions", "list"]);
        assert!(cli.is_ok());
        let cli = cli.unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn test_cli_parse_with_data_dir() {
        let cli = Cli::try_parse_from(["qachat", "--data-dir", "/tmp/qachat", "chat"]);
        assert!(cli.is_ok());
        let cli = cli.unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/qachat")));
    }

    #[test]
    fn test_cli_parse_missing_command() {
        let cli = Cli::try_parse_from(["qachat"]);
        assert!(cli.is_err());
    }

    #[test]
    fn test_cli_parse_invalid_command() {
        let cli = Cli::try_parse_from(["qachat", "invalid"]);
        assert!(cli.is_err());
    }

    #[test]
    fn test_cli_parse_kb_create_requires_name() {
        let cli = Cli::try_parse_from(["qachat", "kb", "create"]);
        assert!(cli.is_err());
    }
}
