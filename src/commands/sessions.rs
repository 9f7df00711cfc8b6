//! Session management commands

use crate::cli::SessionCommand;
use crate::config::Config;
use crate::error::Result;
use crate::store::{ChatStore, LocalStore};
use colored::Colorize;
use prettytable::{format, Table};

/// Handle session commands
pub fn handle_sessions(config: &Config, command: SessionCommand) -> Result<()> {
    let local = LocalStore::open_configured(&config.storage)?;
    let mut store = ChatStore::load(local);

    match command {
        SessionCommand::List => {
            print_session_table(&store);
            println!(
                "Use {} to continue a session.",
                "qachat chat --session <ID>".cyan()
            );
            println!();
        }
        SessionCommand::Delete { id } => {
            store.delete_session(&id)?;
            println!("{}", format!("Deleted session {}", id).green());
        }
    }

    Ok(())
}

/// Print the stored sessions as a table, marking the active one
pub(crate) fn print_session_table(store: &ChatStore) {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

    table.add_row(prettytable::row![
        "".bold(),
        "ID".bold(),
        "Title".bold(),
        "Messages".bold(),
        "Created".bold()
    ]);

    for session in store.sessions() {
        let marker = if session.id == store.active_id() {
            "*"
        } else {
            ""
        };
        let created = super::format_timestamp(&session.created_at);

        table.add_row(prettytable::row![
            marker,
            session.id.cyan(),
            session.title,
            session.messages.len(),
            created
        ]);
    }

    println!("\nChat Sessions:");
    table.printstd();
    println!();
}
