//! Durable persistence for chat sessions.
//!
//! Storage is a small key-value store (one file per key under the data
//! directory) holding the serialized session collection, the active session
//! id and, on upgraded installs, a legacy single-conversation history that
//! is migrated on first load. All failures degrade: a missing or corrupt
//! blob loads as an empty collection and a failed write is dropped with a
//! warning, never surfaced to the user.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::session::{self, Message, Session};

/// Key holding the serialized session collection.
const SESSIONS_KEY: &str = "chat_sessions";
/// Key holding the active session id.
const ACTIVE_ID_KEY: &str = "active_session_id";
/// Pre-sessions releases stored a single bare message list under this key.
const LEGACY_HISTORY_KEY: &str = "chat_history";

/// Minimal persistent key-value contract: text in, text out, scoped to this
/// application instance and surviving restarts.
pub trait KvStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
    fn remove(&mut self, key: &str);
}

/// File-per-key store rooted at a directory. Writes go through a temp file
/// and rename so a crash cannot leave a half-written value.
pub struct DirStore {
    dir: PathBuf,
}

impl DirStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl KvStore for DirStore {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path(key)).ok()
    }

    fn set(&mut self, key: &str, value: &str) {
        if let Err(err) = fs::create_dir_all(&self.dir) {
            warn!(key, %err, "failed to create data directory, dropping write");
            return;
        }
        let tmp = self.dir.join(format!("{key}.tmp"));
        let result = fs::write(&tmp, value).and_then(|_| fs::rename(&tmp, self.path(key)));
        if let Err(err) = result {
            warn!(key, %err, "failed to write value, dropping write");
        }
    }

    fn remove(&mut self, key: &str) {
        let _ = fs::remove_file(self.path(key));
    }
}

/// In-memory store for tests and throwaway runs.
#[derive(Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }
}

/// Session persistence over a key-value backend. Whole-collection
/// overwrites only; the single UI instance is the single writer.
pub struct SessionStore {
    kv: Box<dyn KvStore>,
}

impl SessionStore {
    pub fn new(kv: Box<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Load the session collection, migrating legacy single-conversation
    /// history when no sessions exist yet. Fails soft: missing or corrupt
    /// data yields an empty collection.
    pub fn load(&mut self) -> Vec<Session> {
        let sessions = match self.kv.get(SESSIONS_KEY) {
            Some(blob) => match serde_json::from_str::<Vec<Session>>(&blob) {
                Ok(sessions) => sessions,
                Err(err) => {
                    warn!(%err, "session collection is corrupt, starting empty");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        if sessions.is_empty() {
            if let Some(migrated) = self.migrate_legacy_history() {
                return vec![migrated];
            }
        }
        sessions
    }

    /// Wrap a legacy bare message list into one synthesized session, then
    /// discard the legacy key.
    fn migrate_legacy_history(&mut self) -> Option<Session> {
        let blob = self.kv.get(LEGACY_HISTORY_KEY)?;
        let messages: Vec<Message> = match serde_json::from_str(&blob) {
            Ok(messages) => messages,
            Err(err) => {
                warn!(%err, "legacy history is corrupt, discarding");
                self.kv.remove(LEGACY_HISTORY_KEY);
                return None;
            }
        };
        if messages.is_empty() {
            self.kv.remove(LEGACY_HISTORY_KEY);
            return None;
        }

        debug!(count = messages.len(), "migrating legacy chat history");
        let mut session = match self.load_active_id() {
            Some(id) => Session::with_id(id),
            None => Session::new(),
        };
        session.title = session::derive_title(&messages);
        session.messages = messages;

        self.save_all(std::slice::from_ref(&session));
        self.save_active_id(&session.id);
        self.kv.remove(LEGACY_HISTORY_KEY);
        Some(session)
    }

    pub fn load_active_id(&self) -> Option<String> {
        self.kv.get(ACTIVE_ID_KEY).filter(|id| !id.is_empty())
    }

    /// Overwrite the whole stored collection.
    pub fn save_all(&mut self, sessions: &[Session]) {
        match serde_json::to_string(sessions) {
            Ok(blob) => self.kv.set(SESSIONS_KEY, &blob),
            Err(err) => warn!(%err, "failed to serialize sessions, dropping write"),
        }
    }

    pub fn save_active_id(&mut self, id: &str) {
        self.kv.set(ACTIVE_ID_KEY, id);
    }

    /// Drop every stored key.
    pub fn clear(&mut self) {
        self.kv.remove(SESSIONS_KEY);
        self.kv.remove(ACTIVE_ID_KEY);
        self.kv.remove(LEGACY_HISTORY_KEY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionManager;

    fn store_with(kv: MemoryStore) -> SessionStore {
        SessionStore::new(Box::new(kv))
    }

    #[test]
    fn missing_data_loads_as_empty_collection() {
        let mut store = store_with(MemoryStore::new());
        assert!(store.load().is_empty());
        assert!(store.load_active_id().is_none());
    }

    #[test]
    fn corrupt_blob_loads_as_empty_collection() {
        let mut kv = MemoryStore::new();
        kv.set(SESSIONS_KEY, "{ not json");
        let mut store = store_with(kv);
        assert!(store.load().is_empty());
    }

    #[test]
    fn save_all_round_trips_through_the_backend() {
        let mut store = store_with(MemoryStore::new());
        let mut session = Session::new();
        session.messages.push(Message::user("hi"));
        session.messages.push(Message::assistant("hello"));

        store.save_all(std::slice::from_ref(&session));
        let loaded = store.load();
        assert_eq!(loaded, vec![session]);
    }

    #[test]
    fn legacy_history_is_wrapped_into_one_session() {
        let mut kv = MemoryStore::new();
        let legacy = vec![Message::user("old question"), Message::assistant("old answer")];
        kv.set(
            LEGACY_HISTORY_KEY,
            &serde_json::to_string(&legacy).expect("serialize legacy fixture"),
        );

        let mut store = store_with(kv);
        let loaded = store.load();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].title, "old question");
        assert_eq!(loaded[0].messages, legacy);
    }

    #[test]
    fn legacy_key_is_discarded_after_migration() {
        let mut kv = MemoryStore::new();
        kv.set(
            LEGACY_HISTORY_KEY,
            &serde_json::to_string(&[Message::user("hi")]).expect("serialize legacy fixture"),
        );
        let mut store = store_with(kv);

        let first = store.load();
        assert_eq!(first.len(), 1);
        // Second load must come from the migrated collection, not re-migrate.
        let second = store.load();
        assert_eq!(first, second);
    }

    #[test]
    fn legacy_message_json_uses_camel_case_field_names() {
        let mut kv = MemoryStore::new();
        kv.set(
            LEGACY_HISTORY_KEY,
            r#"[{"content":"hi","isUser":true,"timestamp":"2024-05-01T12:00:00Z"}]"#,
        );
        let mut store = store_with(kv);
        let loaded = store.load();
        assert_eq!(loaded.len(), 1);
        assert!(loaded[0].messages[0].is_user);
    }

    #[test]
    fn dir_store_persists_across_instances() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut store = DirStore::new(dir.path().to_path_buf());
        store.set("some_key", "some value");
        assert_eq!(store.get("some_key").as_deref(), Some("some value"));

        let reopened = DirStore::new(dir.path().to_path_buf());
        assert_eq!(reopened.get("some_key").as_deref(), Some("some value"));

        let mut reopened = reopened;
        reopened.remove("some_key");
        assert!(reopened.get("some_key").is_none());
    }

    #[test]
    fn session_round_trip_through_disk() {
        let dir = tempfile::tempdir().expect("temp dir");

        let store = SessionStore::new(Box::new(DirStore::new(dir.path().to_path_buf())));
        let mut mgr = SessionManager::new(store);
        mgr.append_message(Message::user("first"));
        mgr.append_message(Message::assistant("second"));
        mgr.append_message(Message::user("third"));
        mgr.persist_active();
        let id = mgr.active_id().to_string();
        let sent: Vec<String> = mgr
            .active_messages()
            .iter()
            .map(|m| m.content.clone())
            .collect();
        drop(mgr);

        let store = SessionStore::new(Box::new(DirStore::new(dir.path().to_path_buf())));
        let mut mgr = SessionManager::new(store);
        let restored: Vec<String> = mgr
            .switch_to(&id)
            .expect("session survives reload")
            .iter()
            .map(|m| m.content.clone())
            .collect();
        assert_eq!(restored, sent);
    }
}
