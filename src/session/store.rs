//! Durable session store over a key-value layer.
//!
//! The in-memory map is the source of truth; every mutation is written
//! through to the backing store, and a failed write is logged rather than
//! propagated so a full disk or quota never crashes the caller.

use crate::session::catalog;
use crate::session::kv::{KvError, KvStore};
use crate::session::{Message, SessionId, SessionRecord};
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, warn};

/// Key prefix for session records.
const CHAT_KEY_PREFIX: &str = "chat_";
/// Key holding the last active session id.
const ACTIVE_POINTER_KEY: &str = "currentChatId";

/// Errors surfaced when opening the store. Mutations after open never
/// return an error; write failures are logged and the in-memory state
/// stays authoritative.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Kv(#[from] KvError),
}

/// Persisted record shapes. The original web UI stored a bare message array;
/// it is upgraded to the named shape on first read.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredRecord {
    Current(SessionRecord),
    Legacy(Vec<Message>),
}

pub struct SessionStore {
    kv: Box<dyn KvStore>,
    /// Insertion-ordered records. Ids are monotonic creation times, so this
    /// stays sorted ascending by id across reloads.
    sessions: Vec<(SessionId, SessionRecord)>,
}

impl SessionStore {
    /// Load all persisted sessions, upgrading legacy records in place.
    pub fn open(kv: Box<dyn KvStore>) -> Result<Self, StoreError> {
        let mut store = Self {
            kv,
            sessions: Vec::new(),
        };

        for key in store.kv.keys()? {
            let Some(id) = parse_chat_key(&key) else {
                continue;
            };
            let Some(raw) = store.kv.get(&key)? else {
                continue;
            };
            match serde_json::from_str::<StoredRecord>(&raw) {
                Ok(StoredRecord::Current(record)) => store.sessions.push((id, record)),
                Ok(StoredRecord::Legacy(messages)) => {
                    let record = SessionRecord {
                        name: format!("Chat {}", id.created_date()),
                        messages,
                    };
                    store.sessions.push((id, record.clone()));
                    store.persist(&id, &record);
                }
                Err(e) => {
                    warn!(key = %key, "skipping unreadable session record: {e}");
                }
            }
        }

        store.sessions.sort_by_key(|(id, _)| *id);
        Ok(store)
    }

    /// Create a new empty session. A persistence failure is logged, not
    /// returned; the session exists in memory either way.
    pub fn create(&mut self, name: Option<&str>) -> SessionId {
        let id = SessionId::now();
        let record = match name {
            Some(name) if !name.trim().is_empty() => SessionRecord::new(name),
            _ => SessionRecord::default(),
        };
        self.persist(&id, &record);
        self.sessions.push((id, record));
        id
    }

    pub fn get(&self, id: &SessionId) -> Option<&SessionRecord> {
        self.sessions
            .iter()
            .find(|(sid, _)| sid == id)
            .map(|(_, record)| record)
    }

    /// Rename a session. Empty or whitespace-only names are treated as a
    /// cancelled rename and ignored.
    pub fn rename(&mut self, id: &SessionId, new_name: &str) {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return;
        }
        let Some(record) = self.get_mut(id) else {
            warn!(session = %id, "rename targets a missing session");
            return;
        };
        record.name = new_name.to_string();
        let record = record.clone();
        self.persist(id, &record);
    }

    /// Append a message to a session. If the session was deleted while the
    /// message was in flight, the append is dropped rather than resurrecting
    /// the record.
    pub fn append_message(&mut self, id: &SessionId, message: Message) {
        let Some(record) = self.get_mut(id) else {
            warn!(session = %id, "dropping message for a deleted session");
            return;
        };
        record.messages.push(message);
        let record = record.clone();
        self.persist(id, &record);
    }

    /// Remove a session. Deleting the active session is the caller's concern:
    /// the controller immediately creates and selects a replacement.
    pub fn delete(&mut self, id: &SessionId) {
        let before = self.sessions.len();
        self.sessions.retain(|(sid, _)| sid != id);
        if self.sessions.len() == before {
            warn!(session = %id, "delete targets a missing session");
            return;
        }
        if let Err(e) = self.kv.remove(&chat_key(id)) {
            error!(session = %id, "failed to remove session record: {e}");
        }
    }

    /// All sessions with the active one pinned first, the rest in insertion
    /// order. Deterministic for identical contents and pointer.
    pub fn list(&self, active: Option<&SessionId>) -> Vec<(SessionId, SessionRecord)> {
        catalog::ordered(&self.sessions, active)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Persist the active session pointer.
    pub fn set_active_pointer(&mut self, id: Option<&SessionId>) {
        let result = match id {
            Some(id) => self.kv.set(ACTIVE_POINTER_KEY, &id.to_string()),
            None => self.kv.remove(ACTIVE_POINTER_KEY),
        };
        if let Err(e) = result {
            error!("failed to persist active session pointer: {e}");
        }
    }

    /// Restore the active session pointer, if it still names a live session.
    pub fn load_active_pointer(&self) -> Option<SessionId> {
        let raw = match self.kv.get(ACTIVE_POINTER_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("failed to read active session pointer: {e}");
                return None;
            }
        };
        let id: SessionId = raw.parse().ok()?;
        self.get(&id).is_some().then_some(id)
    }

    fn get_mut(&mut self, id: &SessionId) -> Option<&mut SessionRecord> {
        self.sessions
            .iter_mut()
            .find(|(sid, _)| sid == id)
            .map(|(_, record)| record)
    }

    /// Write-through persistence. Failures leave the in-memory record as the
    /// source of truth for the rest of the run.
    fn persist(&mut self, id: &SessionId, record: &SessionRecord) {
        let json = match serde_json::to_string(record) {
            Ok(json) => json,
            Err(e) => {
                error!(session = %id, "failed to serialize session record: {e}");
                return;
            }
        };
        if let Err(e) = self.kv.set(&chat_key(id), &json) {
            error!(session = %id, "failed to persist session record: {e}");
        }
    }
}

fn chat_key(id: &SessionId) -> String {
    format!("{CHAT_KEY_PREFIX}{id}")
}

fn parse_chat_key(key: &str) -> Option<SessionId> {
    key.strip_prefix(CHAT_KEY_PREFIX)?.parse().ok()
}
