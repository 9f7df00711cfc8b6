//! Chat session store
//!
//! Owns the session list and the active session pointer. Every
//! committed change is written through to the local store, including
//! each reply fragment while a stream is live, so a crash mid-reply
//! loses at most the unflushed tail.

use crate::api::ApiClient;
use crate::error::{QaChatError, Result};
use crate::store::now_iso;
use crate::store::persistence::{LocalStore, ACTIVE_CHAT_KEY, SESSIONS_KEY};
use crate::stream::{self, STREAM_ERROR_NOTICE};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Title given to sessions that have no messages yet
pub const DEFAULT_SESSION_TITLE: &str = "New conversation";

/// Longest prefix of a first message used as the session title
const TITLE_MAX_CHARS: usize = 20;

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single message within a session
///
/// Serialized field names match the browser client's local storage
/// records, as do all types in this module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: String,
}

/// A chat session and its message history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    pub messages: Vec<ChatMessage>,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

/// Store of chat sessions with one active session
pub struct ChatStore {
    sessions: Vec<ChatSession>,
    active_id: String,
    local: LocalStore,
    last_id_millis: i64,
}

impl ChatStore {
    /// Load sessions from the local store, seeding a default session
    /// when nothing (or nothing readable) is stored
    pub fn load(local: LocalStore) -> Self {
        let sessions: Vec<ChatSession> = match local.load(SESSIONS_KEY) {
            Ok(Some(sessions)) => sessions,
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to load chat sessions, starting fresh: {}", e);
                Vec::new()
            }
        };

        let active_id: String = match local.load(ACTIVE_CHAT_KEY) {
            Ok(Some(id)) => id,
            Ok(None) => String::new(),
            Err(e) => {
                tracing::warn!("Failed to load active session id: {}", e);
                String::new()
            }
        };

        let mut store = Self {
            sessions,
            active_id,
            local,
            last_id_millis: 0,
        };
        store.last_id_millis = store.max_known_id();
        store.ensure_active();
        store
    }

    /// All sessions, newest first
    pub fn sessions(&self) -> &[ChatSession] {
        &self.sessions
    }

    /// Id of the active session
    pub fn active_id(&self) -> &str {
        &self.active_id
    }

    /// The active session
    ///
    /// Falls back to the first session if the active id has gone stale;
    /// `ensure_active` keeps that from happening across public calls.
    pub fn active_session(&self) -> &ChatSession {
        self.sessions
            .iter()
            .find(|s| s.id == self.active_id)
            .unwrap_or(&self.sessions[0])
    }

    /// Create a fresh session at the top of the list and activate it
    pub fn create_session(&mut self) -> &ChatSession {
        let session = ChatSession {
            id: self.next_id(),
            title: DEFAULT_SESSION_TITLE.to_string(),
            messages: Vec::new(),
            created_at: now_iso(),
        };

        self.sessions.insert(0, session);
        self.active_id = self.sessions[0].id.clone();
        self.persist_sessions();
        self.persist_active();

        &self.sessions[0]
    }

    /// Make the given session the active one
    ///
    /// # Errors
    ///
    /// Returns `QaChatError::Session` if no session has that id
    pub fn switch_session(&mut self, id: &str) -> Result<()> {
        if !self.sessions.iter().any(|s| s.id == id) {
            return Err(QaChatError::Session(format!("No session with id {}", id)).into());
        }

        self.active_id = id.to_string();
        self.persist_active();
        Ok(())
    }

    /// Delete a session
    ///
    /// Deleting the active session activates the first remaining one,
    /// or seeds a fresh default session if none remain.
    ///
    /// # Errors
    ///
    /// Returns `QaChatError::Session` if no session has that id
    pub fn delete_session(&mut self, id: &str) -> Result<()> {
        let index = self
            .sessions
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| QaChatError::Session(format!("No session with id {}", id)))?;

        self.sessions.remove(index);
        self.persist_sessions();

        if self.active_id == id {
            if let Some(first) = self.sessions.first() {
                self.active_id = first.id.clone();
                self.persist_active();
            } else {
                self.create_session();
            }
        }

        Ok(())
    }

    /// Set the active session's title
    ///
    /// Explicit renames take the text as given; the first-message
    /// truncation rule only applies to automatic titling.
    pub fn rename_active(&mut self, title: &str) {
        let active_id = self.active_id.clone();
        if let Some(session) = self.sessions.iter_mut().find(|s| s.id == active_id) {
            session.title = title.to_string();
        }
        self.persist_sessions();
    }

    /// Send a message from the active session and stream the reply
    ///
    /// Appends the user message, titles the session from the first
    /// message, appends a placeholder assistant reply, then feeds every
    /// decoded fragment into the placeholder (and to `on_fragment`, for
    /// live display) until the stream ends. Transport failures are
    /// surfaced in-band by appending a notice to the reply; they do not
    /// fail the call, and nothing is retried.
    pub async fn send_message<F>(
        &mut self,
        api: &ApiClient,
        content: &str,
        kb_id: &str,
        mut on_fragment: F,
    ) -> Result<()>
    where
        F: FnMut(&str),
    {
        self.ensure_active();
        let session_id = self.active_id.clone();

        let user_message = ChatMessage {
            id: self.next_id(),
            role: Role::User,
            content: content.to_string(),
            timestamp: now_iso(),
        };
        let placeholder = ChatMessage {
            id: self.next_id(),
            role: Role::Assistant,
            content: String::new(),
            timestamp: now_iso(),
        };

        let mut new_title = None;
        {
            let session = self
                .sessions
                .iter_mut()
                .find(|s| s.id == session_id)
                .ok_or_else(|| QaChatError::Session(format!("No session with id {}", session_id)))?;

            session.messages.push(user_message);
            if session.messages.len() == 1 {
                session.title = truncate_title(content);
                new_title = Some(session.title.clone());
            }
            session.messages.push(placeholder);
        }
        self.persist_sessions();

        if let Some(title) = new_title {
            // Best effort; the server keeps its own history per session.
            if let Err(e) = api.update_session_title(&session_id, &title).await {
                tracing::debug!("Failed to sync session title: {}", e);
            }
        }

        let stream_result = match api.open_chat_stream(&session_id, content, kb_id).await {
            Ok(byte_stream) => {
                let sessions = &mut self.sessions;
                let local = &self.local;
                stream::consume_stream(byte_stream, |fragment| {
                    if let Some(message) = sessions
                        .iter_mut()
                        .find(|s| s.id == session_id)
                        .and_then(|s| s.messages.last_mut())
                    {
                        message.content.push_str(fragment);
                    }
                    if let Err(e) = local.save(SESSIONS_KEY, &*sessions) {
                        tracing::warn!("Failed to persist chat sessions: {}", e);
                    }
                    on_fragment(fragment);
                })
                .await
            }
            Err(e) => Err(e),
        };

        if let Err(e) = stream_result {
            tracing::warn!("Reply stream failed: {}", e);
            if let Some(message) = self
                .sessions
                .iter_mut()
                .find(|s| s.id == session_id)
                .and_then(|s| s.messages.last_mut())
            {
                message.content.push_str(STREAM_ERROR_NOTICE);
            }
            self.persist_sessions();
            on_fragment(STREAM_ERROR_NOTICE);
        }

        Ok(())
    }

    /// Restore the invariant that the active id points at a session
    fn ensure_active(&mut self) {
        if self.sessions.is_empty() {
            self.create_session();
            return;
        }

        if !self.sessions.iter().any(|s| s.id == self.active_id) {
            self.active_id = self.sessions[0].id.clone();
            self.persist_active();
        }
    }

    fn next_id(&mut self) -> String {
        let mut millis = Utc::now().timestamp_millis();
        if millis <= self.last_id_millis {
            millis = self.last_id_millis + 1;
        }
        self.last_id_millis = millis;
        millis.to_string()
    }

    fn max_known_id(&self) -> i64 {
        self.sessions
            .iter()
            .flat_map(|s| {
                std::iter::once(s.id.as_str()).chain(s.messages.iter().map(|m| m.id.as_str()))
            })
            .filter_map(|id| id.parse::<i64>().ok())
            .max()
            .unwrap_or(0)
    }

    fn persist_sessions(&self) {
        if let Err(e) = self.local.save(SESSIONS_KEY, &self.sessions) {
            tracing::warn!("Failed to persist chat sessions: {}", e);
        }
    }

    fn persist_active(&self) {
        if let Err(e) = self.local.save(ACTIVE_CHAT_KEY, &self.active_id) {
            tracing::warn!("Failed to persist active session id: {}", e);
        }
    }
}

/// Title for a session given the first message sent into it
///
/// Takes the first 20 characters and marks longer messages with an
/// ellipsis. Counted in characters, not bytes, since titles are often
/// CJK text.
fn truncate_title(content: &str) -> String {
    let mut chars = content.chars();
    let prefix: String = chars.by_ref().take(TITLE_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", prefix)
    } else {
        prefix
    }
}
