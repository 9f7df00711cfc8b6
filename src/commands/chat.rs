//! Interactive chat mode handler.
//!
//! Loads the local stores, opens an API client, and runs a
//! readline-based loop. Plain input is sent as a chat message and the
//! reply is printed fragment by fragment as the server streams it;
//! slash commands manage sessions and knowledge bases in-loop.

use crate::api::ApiClient;
use crate::commands::sessions::print_session_table;
use crate::commands::special::{parse_special_command, print_help, SpecialCommand};
use crate::config::Config;
use crate::error::Result;
use crate::store::{ChatSession, ChatStore, KnowledgeBase, KnowledgeStore, LocalStore};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::Write;

/// Start interactive chat mode
///
/// # Arguments
///
/// * `config` - Global configuration (consumed)
/// * `kb` - Optional override for the configured default knowledge base
/// * `session` - Optional session id to resume instead of the last active one
pub async fn run_chat(config: Config, kb: Option<String>, session: Option<String>) -> Result<()> {
    let local = LocalStore::open_configured(&config.storage)?;
    let mut chat = ChatStore::load(local.clone());
    let mut knowledge = KnowledgeStore::load(local);
    let api = ApiClient::new(&config.server)?;

    let kb_id = kb.unwrap_or_else(|| config.chat.default_kb_id.clone());
    knowledge.set_active(&kb_id)?;

    if let Some(id) = session {
        chat.switch_session(&id)?;
    }

    print_welcome_banner(chat.active_session(), knowledge.active_base());

    let mut rl = DefaultEditor::new()?;

    loop {
        let prompt = format!("[{}] >> ", knowledge.active_base().name);
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }

                // Check for special commands first
                match parse_special_command(trimmed) {
                    Ok(SpecialCommand::NewSession) => {
                        let session = chat.create_session();
                        println!("Started session {}\n", session.id);
                        continue;
                    }
                    Ok(SpecialCommand::ListSessions) => {
                        print_session_table(&chat);
                        continue;
                    }
                    Ok(SpecialCommand::SwitchSession(id)) => {
                        match chat.switch_session(&id) {
                            Ok(()) => {
                                let session = chat.active_session();
                                println!("Switched to {} ({})\n", session.title, session.id);
                            }
                            Err(e) => eprintln!("Error: {}\n", e),
                        }
                        continue;
                    }
                    Ok(SpecialCommand::KnowledgeBase(None)) => {
                        let base = knowledge.active_base();
                        println!("Querying knowledge base {} ({})\n", base.name, base.id);
                        continue;
                    }
                    Ok(SpecialCommand::KnowledgeBase(Some(id))) => {
                        match knowledge.set_active(&id) {
                            Ok(()) => {
                                let base = knowledge.active_base();
                                println!(
                                    "Now querying knowledge base {} ({})\n",
                                    base.name, base.id
                                );
                            }
                            Err(e) => eprintln!("Error: {}\n", e),
                        }
                        continue;
                    }
                    Ok(SpecialCommand::SetTitle(text)) => {
                        chat.rename_active(&text);
                        if let Err(e) = api.update_session_title(chat.active_id(), &text).await {
                            tracing::debug!("Failed to sync session title: {}", e);
                        }
                        println!("Renamed session to {}\n", text);
                        continue;
                    }
                    Ok(SpecialCommand::Help) => {
                        print_help();
                        continue;
                    }
                    Ok(SpecialCommand::Exit) => break,
                    Ok(SpecialCommand::None) => {
                        // Regular chat message
                    }
                    Err(e) => {
                        eprintln!("{}\n", e);
                        continue;
                    }
                }

                rl.add_history_entry(trimmed)?;

                let kb_id = knowledge.active_id().to_string();
                println!();
                let result = chat
                    .send_message(&api, trimmed, &kb_id, |fragment| {
                        print!("{}", fragment);
                        let _ = std::io::stdout().flush();
                    })
                    .await;
                println!("\n");

                if let Err(e) = result {
                    eprintln!("Error: {}\n", e);
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                tracing::error!("Readline error: {:?}", err);
                break;
            }
        }
    }

    println!("Goodbye!");
    Ok(())
}

/// Display welcome banner at the start of interactive chat mode
fn print_welcome_banner(session: &ChatSession, base: &KnowledgeBase) {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║              QAChat Interactive Chat - Welcome!              ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");
    println!("Session:        {} ({})", session.title, session.id);
    println!("Knowledge base: {} ({})\n", base.name, base.id);
    println!("Type '/help' for available commands, 'exit' to quit\n");
}
