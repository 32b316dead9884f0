//! Chat session data model.
//!
//! A session is one named, persisted transcript. Messages are immutable and
//! append-only; insertion order is display order.

mod catalog;
mod kv;
mod store;

pub use catalog::{SessionSummary, ordered, summaries};
pub use kv::{DiskKv, KvError, KvStore, MemoryKv};
pub use store::{SessionStore, StoreError};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};

/// Last issued id, used to keep `SessionId::now` strictly monotonic even
/// when two sessions are created within the same millisecond.
static LAST_ID: AtomicI64 = AtomicI64::new(0);

/// Opaque session identifier derived from creation time (epoch milliseconds).
///
/// Ids are strictly increasing within a process, so ascending id order equals
/// creation order. The decimal rendering is used as the persistence key
/// suffix (`chat_<id>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(i64);

impl SessionId {
    /// Allocate a new id from the current wall clock.
    pub fn now() -> Self {
        let now = Utc::now().timestamp_millis();
        let mut last = LAST_ID.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(last + 1);
            match LAST_ID.compare_exchange_weak(
                last,
                candidate,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Self(candidate),
                Err(current) => last = current,
            }
        }
    }

    /// Creation instant encoded in the id.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.0).single()
    }

    /// Creation date as `YYYY-MM-DD`, used for legacy record names.
    pub fn created_date(&self) -> String {
        self.created_at()
            .map(|t| t.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| self.0.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>().map(Self)
    }
}

/// Message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One transcript entry. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub content: String,
    pub role: Role,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            role: Role::User,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            role: Role::Assistant,
        }
    }
}

/// Accepts both the current shape (`{content, role}`) and the shape written
/// by the original web UI (`{content, isAssistant}`). Re-serialization always
/// produces the current shape.
impl<'de> Deserialize<'de> for Message {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Current {
                content: String,
                role: Role,
            },
            Legacy {
                content: String,
                #[serde(rename = "isAssistant")]
                is_assistant: bool,
            },
        }

        Ok(match Wire::deserialize(deserializer)? {
            Wire::Current { content, role } => Self { content, role },
            Wire::Legacy {
                content,
                is_assistant,
            } => Self {
                content,
                role: if is_assistant {
                    Role::Assistant
                } else {
                    Role::User
                },
            },
        })
    }
}

/// A named transcript. Mutated only by appending a message or renaming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub name: String,
    pub messages: Vec<Message>,
}

impl SessionRecord {
    pub const DEFAULT_NAME: &'static str = "New Chat";

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            messages: Vec::new(),
        }
    }
}

impl Default for SessionRecord {
    fn default() -> Self {
        Self::new(Self::DEFAULT_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_strictly_increase() {
        let a = SessionId::now();
        let b = SessionId::now();
        let c = SessionId::now();
        assert!(a < b && b < c);
    }

    #[test]
    fn test_id_roundtrips_through_display() {
        let id = SessionId::now();
        let parsed: SessionId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_message_current_shape() {
        let msg: Message = serde_json::from_str(r#"{"content":"hi","role":"assistant"}"#).unwrap();
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.content, "hi");
    }

    #[test]
    fn test_message_legacy_shape() {
        let msg: Message = serde_json::from_str(r#"{"content":"hi","isAssistant":true}"#).unwrap();
        assert_eq!(msg.role, Role::Assistant);

        let msg: Message =
            serde_json::from_str(r#"{"content":"hello","isAssistant":false}"#).unwrap();
        assert_eq!(msg.role, Role::User);
    }

    #[test]
    fn test_message_serializes_current_shape() {
        let json = serde_json::to_string(&Message::user("x")).unwrap();
        assert_eq!(json, r#"{"content":"x","role":"user"}"#);
    }

    #[test]
    fn test_record_default_name() {
        assert_eq!(SessionRecord::default().name, "New Chat");
        assert!(SessionRecord::default().messages.is_empty());
    }
}
