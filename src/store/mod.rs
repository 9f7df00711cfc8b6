//! Local state stores
//!
//! Chat sessions and knowledge base records live in an embedded
//! key-value store under the user data directory, one JSON value per
//! key, in the same shape the browser client keeps in local storage.

pub mod chat;
pub mod knowledge;
pub mod persistence;

pub use chat::{ChatMessage, ChatSession, ChatStore, Role};
pub use knowledge::{
    DeleteOutcome, Document, KnowledgeBase, KnowledgeStore, DEFAULT_KB_ID,
};
pub use persistence::LocalStore;

use chrono::{SecondsFormat, Utc};

/// Current time in the ISO-8601 shape the browser client writes
pub(crate) fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Fresh millisecond-timestamp id for records created locally
pub(crate) fn timestamp_id() -> String {
    Utc::now().timestamp_millis().to_string()
}
