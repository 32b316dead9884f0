//! Streaming message aggregation.
//!
//! The aggregator owns at most one inbound SSE stream at a time. Starting a
//! new stream supersedes the old one: the old reader task is cancelled, its
//! handle stops yielding events, and it never finalizes. A stream that
//! reaches the terminal marker emits exactly one `Complete` and ends; a
//! transport failure ends the task silently with the partial text discarded.

pub mod response;
pub mod sse;

use crate::session::SessionId;
use response::GenerateResponse;
use sse::SseParser;

use futures::StreamExt;
use reqwest::header::ACCEPT;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Connection timeout; reads have none — a stream stays open until the
/// terminal marker, a transport error, or supersession.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Event channel depth per stream.
const EVENT_BUFFER: usize = 64;

/// Backend selection for one stream.
#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// Service path segment, e.g. `ollama` or `openai`.
    pub provider: String,
    /// Model identifier passed through to the service.
    pub model: String,
    /// Knowledge-base tag; presence selects the retrieval-augmented variant
    /// of the endpoint.
    pub rag_tag: Option<String>,
}

/// Events observed on one stream instance.
///
/// `Update` carries the full accumulated text so far (renderers recompute,
/// they do not diff). `Complete` fires at most once and is always last.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Update(String),
    Complete(String),
}

/// Consumer side of one stream. Closing, superseding, or dropping the handle
/// cancels the reader task and silences the handle itself: `next` checks the
/// cancellation token before the channel, so events already buffered at
/// close time are never delivered.
pub struct StreamHandle {
    session_id: SessionId,
    events: mpsc::Receiver<StreamEvent>,
    cancel: CancellationToken,
}

impl StreamHandle {
    pub(crate) fn new(
        session_id: SessionId,
        events: mpsc::Receiver<StreamEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            session_id,
            events,
            cancel,
        }
    }

    /// The session this stream was scoped to at start. Persistence targets
    /// this id regardless of which session is active at completion time.
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Next event, or `None` once the stream has ended (completed, failed,
    /// or cancelled). A cancelled stream yields `None` even if events were
    /// buffered before the cancellation.
    pub async fn next(&mut self) -> Option<StreamEvent> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => None,
            event = self.events.recv() => event,
        }
    }

    /// Idempotent cancellation without completion.
    pub fn close(&self) {
        self.cancel.cancel();
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Owns the single open stream slot.
pub struct StreamAggregator {
    client: reqwest::Client,
    base_url: String,
    active: Option<CancellationToken>,
}

impl StreamAggregator {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: base_url.into(),
            active: None,
        }
    }

    /// Open a stream for `query` scoped to `session_id`, superseding any
    /// stream already open. The superseded stream never finalizes.
    pub fn start(
        &mut self,
        session_id: SessionId,
        query: &str,
        options: &StreamOptions,
    ) -> StreamHandle {
        self.close();

        let cancel = CancellationToken::new();
        self.active = Some(cancel.clone());

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let url = build_stream_url(&self.base_url, query, options);
        let client = self.client.clone();
        let task_cancel = cancel.clone();

        tokio::spawn(async move {
            if let Err(e) = run_stream(&client, &url, &tx, &task_cancel).await {
                // Transport failure: discard the partial text, surface
                // nothing beyond the log. No reconnect.
                warn!(session = %session_id, "stream transport error: {e}");
            }
        });

        StreamHandle::new(session_id, rx, cancel)
    }

    /// Cancel the open stream, if any, without completion. Idempotent.
    pub fn close(&mut self) {
        if let Some(cancel) = self.active.take() {
            cancel.cancel();
        }
    }
}

/// Read one SSE stream to its terminal marker.
///
/// Emits `Update` after every fragment and exactly one `Complete` on the
/// terminal marker, then returns. Malformed payloads are skipped. Returns
/// without `Complete` if the transport fails, the remote closes early, or
/// the token fires.
async fn run_stream(
    client: &reqwest::Client,
    url: &str,
    tx: &mpsc::Sender<StreamEvent>,
    cancel: &CancellationToken,
) -> Result<(), reqwest::Error> {
    let response = tokio::select! {
        () = cancel.cancelled() => return Ok(()),
        response = client
            .get(url)
            .header(ACCEPT, "text/event-stream")
            .send() => response?.error_for_status()?,
    };

    let mut body = response.bytes_stream();
    let mut parser = SseParser::new();
    let mut accumulated = String::new();

    loop {
        let chunk = tokio::select! {
            () = cancel.cancelled() => return Ok(()),
            chunk = body.next() => match chunk {
                Some(chunk) => chunk?,
                None => break,
            },
        };

        for event in parser.feed(&chunk) {
            let payload: GenerateResponse = match serde_json::from_str(&event.data) {
                Ok(payload) => payload,
                Err(e) => {
                    debug!("skipping malformed stream payload: {e}");
                    continue;
                }
            };

            if let Some(fragment) = payload.fragment() {
                accumulated.push_str(fragment);
                if tx.send(StreamEvent::Update(accumulated.clone())).await.is_err() {
                    // Receiver gone: the handle was dropped.
                    return Ok(());
                }
            }

            if payload.is_finished() {
                let _ = tx.send(StreamEvent::Complete(accumulated)).await;
                return Ok(());
            }
        }
    }

    // Remote closed without a terminal marker; treated like a transport
    // failure, nothing is finalized.
    debug!("stream ended without terminal marker");
    Ok(())
}

/// Request target for one stream. A knowledge-base tag selects the
/// retrieval-augmented variant of the endpoint.
fn build_stream_url(base_url: &str, message: &str, options: &StreamOptions) -> String {
    let message = urlencoding::encode(message);
    let model = urlencoding::encode(&options.model);
    match &options.rag_tag {
        Some(tag) => format!(
            "{base_url}/api/v1/{}/generate_stream_rag?message={message}&ragTag={}&model={model}",
            options.provider,
            urlencoding::encode(tag),
        ),
        None => format!(
            "{base_url}/api/v1/{}/generate_stream?message={message}&model={model}",
            options.provider,
        ),
    }
}
