//! Conversation data model and the in-memory session manager.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::SessionStore;

/// Maximum title length derived from the first user message.
const TITLE_LIMIT: usize = 50;

/// One turn in a conversation. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub content: String,
    pub is_user: bool,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_user: true,
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_user: false,
            timestamp: Utc::now(),
        }
    }
}

/// One persisted conversation. `timestamp` is the last-saved instant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub title: String,
    pub timestamp: DateTime<Utc>,
    pub messages: Vec<Message>,
}

impl Session {
    /// Fresh in-memory session; not persisted until it holds a message.
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4().to_string())
    }

    pub fn with_id(id: String) -> Self {
        Self {
            id,
            title: "New Chat".to_string(),
            timestamp: Utc::now(),
            messages: Vec::new(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Display summary of one saved session, newest-first in listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub id: String,
    pub title: String,
    pub timestamp: DateTime<Utc>,
    pub message_count: usize,
    /// First assistant reply, shortened for the picker.
    pub preview: Option<String>,
    pub is_active: bool,
}

/// Title from the first user message: first 50 characters, `...` appended
/// when truncated, "New Chat" when no user message exists yet.
pub fn derive_title(messages: &[Message]) -> String {
    let Some(first_user) = messages.iter().find(|m| m.is_user) else {
        return "New Chat".to_string();
    };
    let mut title: String = first_user.content.chars().take(TITLE_LIMIT).collect();
    if first_user.content.chars().count() > TITLE_LIMIT {
        title.push_str("...");
    }
    title
}

/// Owns the saved session collection and the active working session.
///
/// The active session lives here as a working copy; it enters the saved
/// collection only through `persist_active`, so an empty conversation is
/// never written to the store.
pub struct SessionManager {
    store: SessionStore,
    saved: Vec<Session>,
    active: Session,
}

impl SessionManager {
    /// Load the collection and resolve the active session. A stored active
    /// id that matches no saved session starts an empty session under that
    /// id, matching a fresh install or an unsaved conversation.
    pub fn new(mut store: SessionStore) -> Self {
        let saved = store.load();
        let active = match store.load_active_id() {
            Some(id) => saved
                .iter()
                .find(|s| s.id == id)
                .cloned()
                .unwrap_or_else(|| Session::with_id(id)),
            None => Session::new(),
        };
        Self {
            store,
            saved,
            active,
        }
    }

    pub fn active_id(&self) -> &str {
        &self.active.id
    }

    pub fn active_messages(&self) -> &[Message] {
        &self.active.messages
    }

    /// Start a new empty conversation and make it active. The previous
    /// conversation is persisted first when it has messages.
    pub fn create_session(&mut self) {
        self.persist_active();
        self.active = Session::new();
        self.store.save_active_id(&self.active.id);
    }

    /// Make `id` the active session and return its messages. Unknown ids
    /// are a silent no-op.
    pub fn switch_to(&mut self, id: &str) -> Option<&[Message]> {
        if id == self.active.id {
            return Some(&self.active.messages);
        }
        let target = self.saved.iter().find(|s| s.id == id)?.clone();
        self.persist_active();
        self.active = target;
        self.store.save_active_id(&self.active.id);
        Some(&self.active.messages)
    }

    /// Remove a session from the store. Deleting the active session starts
    /// a fresh one, as `create_session` would.
    pub fn delete_session(&mut self, id: &str) {
        self.saved.retain(|s| s.id != id);
        self.store.save_all(&self.saved);
        if id == self.active.id {
            self.active = Session::new();
            self.store.save_active_id(&self.active.id);
        }
    }

    /// Remove every saved session and start fresh.
    pub fn clear_all(&mut self) {
        self.saved.clear();
        self.store.clear();
        self.active = Session::new();
        self.store.save_active_id(&self.active.id);
    }

    /// Append to the active conversation. Does not persist by itself.
    pub fn append_message(&mut self, message: Message) {
        self.active.messages.push(message);
    }

    /// Refresh title and timestamp, upsert the active session into the
    /// collection and write the whole collection out. No-op while the
    /// active session has no messages.
    pub fn persist_active(&mut self) {
        if self.active.messages.is_empty() {
            return;
        }
        self.active.title = derive_title(&self.active.messages);
        self.active.timestamp = Utc::now();

        match self.saved.iter_mut().find(|s| s.id == self.active.id) {
            Some(slot) => *slot = self.active.clone(),
            None => self.saved.push(self.active.clone()),
        }
        self.store.save_all(&self.saved);
        self.store.save_active_id(&self.active.id);
    }

    /// Summaries of all saved sessions, newest first.
    pub fn list_sessions(&self) -> impl Iterator<Item = SessionSummary> + '_ {
        let mut order: Vec<&Session> = self.saved.iter().collect();
        order.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        order.into_iter().map(|session| SessionSummary {
            id: session.id.clone(),
            title: session.title.clone(),
            timestamp: session.timestamp,
            message_count: session.messages.len(),
            preview: session
                .messages
                .iter()
                .find(|m| !m.is_user)
                .map(|m| shorten(&m.content, 60)),
            is_active: session.id == self.active.id,
        })
    }

    pub fn session_count(&self) -> usize {
        self.saved.len()
    }
}

fn shorten(text: &str, limit: usize) -> String {
    let mut out: String = text.chars().take(limit).collect();
    if text.chars().count() > limit {
        out.push_str("...");
    }
    out
}
