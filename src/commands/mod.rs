/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

It exposes three top-level command modules:

- `chat`      — Interactive chat mode
- `sessions`  — Session listing and removal
- `knowledge` — Knowledge base and document management

These handlers are intentionally small and use the library components:
the API client, the stores, and the stream assembler.
*/

use std::io::Write;

// Interactive chat loop
pub mod chat;

// Knowledge base management
pub mod knowledge;

// Session management
pub mod sessions;

// Special commands parser for the chat loop
pub mod special;

/// Ask the user a yes/no question on stdin, defaulting to no
pub(crate) fn confirm(prompt: &str) -> bool {
    print!("{} [y/N] ", prompt);
    if std::io::stdout().flush().is_err() {
        return false;
    }

    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Render a stored RFC 3339 timestamp for table output
///
/// Unparseable values come back unchanged rather than hiding the row.
pub(crate) fn format_timestamp(raw: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp_rfc3339() {
        assert_eq!(
            format_timestamp("2026-08-25T10:30:00.000Z"),
            "2026-08-25 10:30"
        );
    }

    #[test]
    fn test_format_timestamp_garbage_passes_through() {
        assert_eq!(format_timestamp("yesterday"), "yesterday");
    }
}
