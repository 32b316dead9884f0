//! Session orchestration.
//!
//! The controller wires user-submitted text into the stream aggregator and
//! tells the store when to persist. Persistence of a completed response is
//! keyed to the session id captured when the stream started, so a response
//! can finish and save into a background session after the user navigates
//! away, and an append into a deleted session is dropped by the store.

use crate::session::{
    Message, SessionId, SessionRecord, SessionStore, SessionSummary, summaries,
};
use crate::stream::{StreamAggregator, StreamEvent, StreamHandle, StreamOptions};
use std::collections::VecDeque;
use tracing::debug;

/// Notifications for the rendering layer.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// Live accumulated text for an in-flight response. Rendered from the
    /// full text each time; not a diff.
    Update { session_id: SessionId, text: String },
    /// Final text of a completed response, already persisted.
    Complete { session_id: SessionId, text: String },
    /// The ordered session list changed (create, delete, rename, switch,
    /// message appended).
    SessionListChanged(Vec<SessionSummary>),
}

pub struct ChatController {
    store: SessionStore,
    aggregator: StreamAggregator,
    options: StreamOptions,
    active: Option<SessionId>,
    stream: Option<StreamHandle>,
    pending: VecDeque<ChatEvent>,
}

impl ChatController {
    /// Open the disk-backed store described by `config` and wire up an
    /// aggregator for its base URL.
    pub fn from_config(config: &crate::config::Config) -> crate::error::Result<Self> {
        let kv = crate::session::DiskKv::open(config.sessions_dir())?;
        let store = SessionStore::open(Box::new(kv))?;
        let aggregator = StreamAggregator::new(config.base_url.clone());
        Ok(Self::new(store, aggregator, config.stream_options()))
    }

    /// Wrap a store and aggregator, restoring the last active session if it
    /// still exists.
    pub fn new(store: SessionStore, aggregator: StreamAggregator, options: StreamOptions) -> Self {
        let active = store.load_active_pointer();
        Self {
            store,
            aggregator,
            options,
            active,
            stream: None,
            pending: VecDeque::new(),
        }
    }

    pub fn active_session(&self) -> Option<SessionId> {
        self.active
    }

    pub fn options(&self) -> &StreamOptions {
        &self.options
    }

    /// Swap the backend selection used for subsequent streams. Does not
    /// affect a stream already in flight.
    pub fn set_options(&mut self, options: StreamOptions) {
        self.options = options;
    }

    pub fn set_rag_tag(&mut self, rag_tag: Option<String>) {
        self.options.rag_tag = rag_tag;
    }

    /// Create and select a fresh session.
    pub fn new_chat(&mut self) -> SessionId {
        let id = self.store.create(None);
        self.select(Some(id));
        self.notify_list_changed();
        id
    }

    /// Switch the active session. Does not cancel an in-flight stream: its
    /// persistence stays keyed to the id captured at start.
    pub fn load_chat(&mut self, id: SessionId) -> bool {
        if self.store.get(&id).is_none() {
            debug!(session = %id, "load targets a missing session");
            return false;
        }
        self.select(Some(id));
        self.notify_list_changed();
        true
    }

    /// Delete a session. Deleting the active one atomically creates and
    /// selects a replacement, so the system is never without an active
    /// session once any chat exists. An in-flight stream scoped to the
    /// deleted session keeps running; its eventual append is dropped.
    pub fn delete_chat(&mut self, id: SessionId) {
        self.store.delete(&id);
        if self.active == Some(id) {
            let replacement = self.store.create(None);
            self.select(Some(replacement));
        }
        self.notify_list_changed();
    }

    pub fn rename_chat(&mut self, id: SessionId, new_name: &str) {
        self.store.rename(&id, new_name);
        self.notify_list_changed();
    }

    /// Submit user text: ensure an active session, persist the user message,
    /// and open a stream scoped to that session. Empty input is ignored.
    /// Any stream already open is superseded and never finalizes.
    pub fn submit(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        let session_id = match self.active {
            Some(id) => id,
            None => {
                let id = self.store.create(None);
                self.select(Some(id));
                id
            }
        };

        self.store.append_message(&session_id, Message::user(text));
        self.notify_list_changed();
        self.stream = Some(self.aggregator.start(session_id, text, &self.options));
    }

    /// True while a response stream is open.
    pub fn is_streaming(&self) -> bool {
        self.stream.is_some()
    }

    /// Cancel the in-flight stream, if any, discarding its partial text.
    pub fn cancel_stream(&mut self) {
        self.aggregator.close();
        self.stream = None;
    }

    /// Next event for the rendering layer. Drains queued list-change
    /// notifications first, then waits on the open stream. Returns `None`
    /// when there is nothing queued and no stream is open, or when the open
    /// stream ends without completing (transport failure: partial text is
    /// discarded, nothing persisted).
    pub async fn next_event(&mut self) -> Option<ChatEvent> {
        if let Some(event) = self.pending.pop_front() {
            return Some(event);
        }

        let handle = self.stream.as_mut()?;
        match handle.next().await {
            Some(StreamEvent::Update(text)) => Some(ChatEvent::Update {
                session_id: handle.session_id(),
                text,
            }),
            Some(StreamEvent::Complete(text)) => {
                let session_id = handle.session_id();
                self.stream = None;
                // Exactly-once finalization: the single Complete is the only
                // point where an assistant message is persisted.
                self.store
                    .append_message(&session_id, Message::assistant(text.clone()));
                self.notify_list_changed();
                Some(ChatEvent::Complete { session_id, text })
            }
            None => {
                debug!("stream ended without completion");
                self.stream = None;
                None
            }
        }
    }

    /// Sessions in display order: active first, then insertion order.
    pub fn sessions(&self) -> Vec<SessionSummary> {
        summaries(&self.store.list(self.active.as_ref()))
    }

    /// Transcript of one session.
    pub fn transcript(&self, id: SessionId) -> Option<&SessionRecord> {
        self.store.get(&id)
    }

    fn select(&mut self, id: Option<SessionId>) {
        self.active = id;
        self.store.set_active_pointer(self.active.as_ref());
    }

    fn notify_list_changed(&mut self) {
        self.pending
            .push_back(ChatEvent::SessionListChanged(self.sessions()));
    }
}
