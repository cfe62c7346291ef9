//! Per-playback-item track extraction sessions.
//!
//! A [`TrackExtraction`] owns the parse-once state of one playback item. Each
//! time the item's stream is opened from byte 0 it starts a session: a
//! bridge is created, the container parser runs on a blocking task over the
//! bridge's reader, and an async supervisor waits for the parser (or for
//! cancellation) and hands the result to the listener. Once a session has
//! delivered, the item is complete and later opens are not tapped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use tracktap_media::{extract_tracks, ParseResult};

use crate::bridge::{self, BridgeHandle, BridgeReader, BridgeWriter, StreamBudget};

/// Callback receiving the tracks of a completed session.
pub type TrackListener = Arc<dyn Fn(ParseResult) + Send + Sync>;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

struct ActiveSession {
    id: u64,
    bridge: BridgeHandle,
    cancel: CancellationToken,
}

impl ActiveSession {
    fn cancel(&self) {
        self.cancel.cancel();
        self.bridge.cancel();
    }
}

#[derive(Default)]
struct ExtractionState {
    complete: bool,
    active: Option<ActiveSession>,
}

struct Shared {
    state: Mutex<ExtractionState>,
    listener: TrackListener,
}

/// Track extraction for one playback item.
pub struct TrackExtraction {
    runtime: Handle,
    budget: StreamBudget,
    shared: Arc<Shared>,
}

impl TrackExtraction {
    pub fn new<F>(runtime: Handle, listener: F) -> Self
    where
        F: Fn(ParseResult) + Send + Sync + 'static,
    {
        Self::with_budget(runtime, StreamBudget::DEFAULT, listener)
    }

    pub fn with_budget<F>(runtime: Handle, budget: StreamBudget, listener: F) -> Self
    where
        F: Fn(ParseResult) + Send + Sync + 'static,
    {
        Self {
            runtime,
            budget,
            shared: Arc::new(Shared {
                state: Mutex::new(ExtractionState::default()),
                listener: Arc::new(listener),
            }),
        }
    }

    /// Create an extraction whose results are sent on a channel.
    pub fn with_channel(runtime: Handle) -> (Self, mpsc::UnboundedReceiver<ParseResult>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let extraction = Self::new(runtime, move |result| {
            let _ = tx.send(result);
        });
        (extraction, rx)
    }

    /// Start a session for a stream opened at byte 0.
    ///
    /// Cancels any session that is still running. Returns the producer side
    /// of the new session's bridge, or `None` if this item already delivered
    /// its tracks.
    pub fn begin(&self) -> Option<BridgeWriter> {
        let mut state = self.shared.state.lock();
        if state.complete {
            trace!("Tracks already extracted, not tapping stream");
            return None;
        }
        if let Some(previous) = state.active.take() {
            debug!(session = previous.id, "Cancelling superseded session");
            previous.cancel();
        }

        let (writer, reader) = bridge::with_budget(self.budget);
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        state.active = Some(ActiveSession {
            id,
            bridge: writer.handle(),
            cancel: cancel.clone(),
        });
        drop(state);

        debug!(session = id, "Track extraction session started");
        self.runtime
            .spawn(supervise(id, reader, cancel, self.shared.clone()));
        Some(writer)
    }

    /// Cancel the running session without delivering a result.
    pub fn cancel(&self) {
        if let Some(active) = self.shared.state.lock().active.take() {
            debug!(session = active.id, "Track extraction session cancelled");
            active.cancel();
        }
    }

    /// Whether a session already delivered this item's tracks.
    pub fn is_complete(&self) -> bool {
        self.shared.state.lock().complete
    }

    /// Whether a session is running.
    pub fn is_active(&self) -> bool {
        self.shared.state.lock().active.is_some()
    }
}

impl Drop for TrackExtraction {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Run the parser for session `id` and deliver its result once.
async fn supervise(id: u64, reader: BridgeReader, cancel: CancellationToken, shared: Arc<Shared>) {
    let bridge = reader.handle();
    let parse = tokio::task::spawn_blocking(move || {
        let mut reader = reader;
        let result = extract_tracks(&mut reader);
        reader.finish();
        result
    });

    let result = tokio::select! {
        joined = parse => match joined {
            Ok(result) => result,
            Err(e) => {
                debug!(session = id, error = %e, "Track parser task failed");
                ParseResult::new()
            }
        },
        _ = cancel.cancelled() => {
            bridge.cancel();
            trace!(session = id, "Supervisor stopped by cancellation");
            return;
        }
    };

    {
        let mut state = shared.state.lock();
        match &state.active {
            Some(active) if active.id == id => {}
            _ => {
                trace!(session = id, "Session superseded, dropping result");
                return;
            }
        }
        state.active = None;
        state.complete = true;
    }

    debug!(
        session = id,
        tracks = result.len(),
        bytes = bridge.bytes_forwarded(),
        "Delivering track metadata"
    );
    (shared.listener)(result);
}
