//! SSE log tap: a `tracing_subscriber::Layer` that mirrors every event into
//! a ring buffer and a broadcast channel, served at `/logs/stream` and
//! `/logs/dump`, in `pmoserver::logs`'s style.

use std::collections::VecDeque;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use futures::Stream;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::field::{Field, Visit};
use tracing::{Event as TracingEvent, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

const DEFAULT_BUFFER_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp_unix_ms: u128,
    pub level: String,
    pub target: String,
    pub message: String,
}

/// Shared ring buffer + broadcast tap, cheaply clonable for use as Axum state.
#[derive(Clone)]
pub struct LogState {
    buffer: Arc<RwLock<VecDeque<LogEntry>>>,
    capacity: usize,
    tx: broadcast::Sender<LogEntry>,
}

impl LogState {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
            tx: broadcast::channel(capacity.max(16)).0,
        }
    }

    fn push(&self, entry: LogEntry) {
        let mut buf = self.buffer.write().expect("log buffer poisoned");
        if buf.len() == self.capacity {
            buf.pop_front();
        }
        buf.push_back(entry.clone());
        let _ = self.tx.send(entry);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.tx.subscribe()
    }

    pub fn dump(&self) -> Vec<LogEntry> {
        self.buffer.read().expect("log buffer poisoned").iter().cloned().collect()
    }
}

impl Default for LogState {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_CAPACITY)
    }
}

/// Captures the `message` field of a tracing event, ignoring the rest —
/// good enough for a human-facing log tap, not a structured sink.
#[derive(Default)]
struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

/// A `tracing_subscriber::Layer` that mirrors every event into a [`LogState`],
/// so `/logs/stream` can tail the process's own tracing output over SSE.
pub struct SseLayer {
    state: LogState,
}

impl SseLayer {
    pub fn new(state: LogState) -> Self {
        Self { state }
    }
}

impl<S: Subscriber> Layer<S> for SseLayer {
    fn on_event(&self, event: &TracingEvent<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let entry = LogEntry {
            timestamp_unix_ms: SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or(0),
            level: event.metadata().level().to_string(),
            target: event.metadata().target().to_string(),
            message: visitor.0,
        };
        self.state.push(entry);
    }
}

/// `GET /logs/stream` — historical buffer first, then a live tail.
pub async fn log_stream(State(state): State<LogState>) -> Sse<impl Stream<Item = Result<Event, std::convert::Infallible>>> {
    let history = state.dump();
    let mut rx = state.subscribe();

    let stream = async_stream::stream! {
        for entry in history {
            if let Ok(json) = serde_json::to_string(&entry) {
                yield Ok(Event::default().data(json));
            }
        }
        while let Ok(entry) = rx.recv().await {
            if let Ok(json) = serde_json::to_string(&entry) {
                yield Ok(Event::default().data(json));
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// `GET /logs/dump` — a JSON snapshot of the current buffer.
pub async fn log_dump(State(state): State<LogState>) -> impl IntoResponse {
    Json(state.dump())
}
