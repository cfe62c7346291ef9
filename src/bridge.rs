//! Bounded streaming bridge between the playback read path and the parser.
//!
//! The producer side ([`BridgeWriter`]) is fed a copy of every byte the
//! playback path reads. The consumer side ([`BridgeReader`]) is a blocking
//! [`Read`] that the container parser runs on. The two are joined by a
//! fixed-capacity ring buffer: when it is full the producer blocks, which is
//! the only backpressure the playback path ever sees.
//!
//! A session ends in one of three ways:
//!
//! - the consumer finishes ([`BridgeReader::finish`], or dropping it)
//! - the session is cancelled ([`BridgeHandle::cancel`])
//! - the byte budget runs out, after which no more bytes are forwarded and
//!   the consumer reads end of stream once the buffered bytes are drained
//!
//! In every case the producer is released and further offers are no-ops.

use std::collections::VecDeque;
use std::io::{self, Read};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace};

/// Capacity and byte budget of a bridge session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamBudget {
    /// Ring buffer capacity in bytes.
    pub buffer_capacity: usize,
    /// Total bytes forwarded to the consumer before the session gives up.
    pub max_bytes: u64,
}

impl StreamBudget {
    pub const BUFFER_CAPACITY: usize = 64 * 1024;
    pub const MAX_BYTES: u64 = 50 * 1024 * 1024;

    pub const DEFAULT: StreamBudget = StreamBudget {
        buffer_capacity: Self::BUFFER_CAPACITY,
        max_bytes: Self::MAX_BYTES,
    };
}

impl Default for StreamBudget {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Life-cycle of a bridge session as seen by the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// The consumer is still reading.
    Running,
    /// The consumer finished.
    Done,
    /// The session was cancelled from outside.
    Cancelled,
}

/// State of the producer's input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Open,
    Closed,
    /// The byte budget was reached.
    Exhausted,
}

struct Inner {
    buffer: VecDeque<u8>,
    state: SessionState,
    input: Input,
    forwarded: u64,
}

impl Inner {
    fn is_active(&self) -> bool {
        self.state == SessionState::Running && self.input == Input::Open
    }

    /// Drop the ring buffer's allocation.
    fn release(&mut self) {
        self.buffer = VecDeque::new();
    }
}

struct Shared {
    inner: Mutex<Inner>,
    /// Signalled when bytes arrive or the input ends.
    readable: Condvar,
    /// Signalled when space frees up or the session ends.
    writable: Condvar,
    budget: StreamBudget,
}

impl Shared {
    fn end(&self, state: SessionState) -> bool {
        let mut inner = self.inner.lock();
        if inner.state != SessionState::Running {
            return false;
        }
        inner.state = state;
        inner.release();
        self.readable.notify_all();
        self.writable.notify_all();
        true
    }
}

/// Create a bridge for a stream opened at `offset`.
///
/// Only a stream that starts at byte 0 can be parsed, so any other offset
/// yields `None`.
pub fn open(offset: u64) -> Option<(BridgeWriter, BridgeReader)> {
    if offset != 0 {
        trace!(offset, "Not bridging a stream opened mid-way");
        return None;
    }
    Some(with_budget(StreamBudget::DEFAULT))
}

/// Create a bridge with an explicit budget.
pub fn with_budget(budget: StreamBudget) -> (BridgeWriter, BridgeReader) {
    let capacity = budget.buffer_capacity.max(1);
    let shared = Arc::new(Shared {
        inner: Mutex::new(Inner {
            buffer: VecDeque::with_capacity(capacity),
            state: SessionState::Running,
            input: Input::Open,
            forwarded: 0,
        }),
        readable: Condvar::new(),
        writable: Condvar::new(),
        budget: StreamBudget {
            buffer_capacity: capacity,
            ..budget
        },
    });

    (
        BridgeWriter {
            shared: shared.clone(),
        },
        BridgeReader { shared },
    )
}

/// Producer side of a bridge.
///
/// Dropping the writer closes the input.
pub struct BridgeWriter {
    shared: Arc<Shared>,
}

impl BridgeWriter {
    /// Forward a copy of `data` to the consumer.
    ///
    /// Blocks while the ring buffer is full. Returns `false` once the session
    /// no longer accepts bytes (consumer finished, cancelled, budget spent or
    /// input closed); the remainder of `data` is then dropped. Never fails.
    pub fn offer(&self, mut data: &[u8]) -> bool {
        let shared = &*self.shared;
        let mut inner = shared.inner.lock();

        loop {
            if !inner.is_active() {
                return false;
            }
            if data.is_empty() {
                return true;
            }

            let space = shared.budget.buffer_capacity - inner.buffer.len();
            if space == 0 {
                shared.writable.wait(&mut inner);
                continue;
            }

            let remaining = shared.budget.max_bytes - inner.forwarded;
            let n = data
                .len()
                .min(space)
                .min(usize::try_from(remaining).unwrap_or(usize::MAX));
            inner.buffer.extend(&data[..n]);
            inner.forwarded += n as u64;
            data = &data[n..];
            shared.readable.notify_one();

            if inner.forwarded >= shared.budget.max_bytes {
                inner.input = Input::Exhausted;
                shared.readable.notify_all();
                debug!(
                    bytes = inner.forwarded,
                    "Byte budget reached, no longer forwarding"
                );
                return false;
            }
        }
    }

    /// Signal end of input. The consumer drains what is buffered and then
    /// reads end of stream. Idempotent.
    pub fn close(&self) {
        let mut inner = self.shared.inner.lock();
        if inner.input == Input::Open {
            inner.input = Input::Closed;
            self.shared.readable.notify_all();
        }
    }

    /// Whether further offers would be accepted.
    pub fn is_active(&self) -> bool {
        self.shared.inner.lock().is_active()
    }

    pub fn handle(&self) -> BridgeHandle {
        BridgeHandle {
            shared: self.shared.clone(),
        }
    }
}

impl Drop for BridgeWriter {
    fn drop(&mut self) {
        self.close();
    }
}

/// Consumer side of a bridge.
///
/// Dropping the reader finishes the session.
pub struct BridgeReader {
    shared: Arc<Shared>,
}

impl BridgeReader {
    /// Mark the consumer as finished, releasing the buffer and any blocked
    /// producer. Idempotent.
    pub fn finish(&self) {
        if self.shared.end(SessionState::Done) {
            trace!("Bridge consumer finished");
        }
    }

    pub fn handle(&self) -> BridgeHandle {
        BridgeHandle {
            shared: self.shared.clone(),
        }
    }
}

impl Read for BridgeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let shared = &*self.shared;
        let mut inner = shared.inner.lock();
        loop {
            match inner.state {
                SessionState::Cancelled => {
                    return Err(io::Error::new(
                        io::ErrorKind::ConnectionAborted,
                        "bridge session cancelled",
                    ));
                }
                SessionState::Done => return Ok(0),
                SessionState::Running => {}
            }

            if !inner.buffer.is_empty() {
                let n = inner.buffer.read(buf)?;
                shared.writable.notify_one();
                return Ok(n);
            }

            if inner.input != Input::Open {
                return Ok(0);
            }

            shared.readable.wait(&mut inner);
        }
    }
}

impl Drop for BridgeReader {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Shared handle for observing or cancelling a session.
#[derive(Clone)]
pub struct BridgeHandle {
    shared: Arc<Shared>,
}

impl BridgeHandle {
    /// Cancel the session: a blocked producer returns, the consumer's next
    /// read fails and the buffer is released. No-op once the session ended.
    pub fn cancel(&self) {
        if self.shared.end(SessionState::Cancelled) {
            debug!("Bridge session cancelled");
        }
    }

    pub fn state(&self) -> SessionState {
        self.shared.inner.lock().state
    }

    /// Total bytes forwarded to the consumer so far.
    pub fn bytes_forwarded(&self) -> u64 {
        self.shared.inner.lock().forwarded
    }

    /// Bytes currently buffered and not yet consumed.
    pub fn buffered(&self) -> usize {
        self.shared.inner.lock().buffer.len()
    }

    pub fn budget(&self) -> StreamBudget {
        self.shared.budget
    }
}

impl std::fmt::Debug for BridgeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.shared.inner.lock();
        f.debug_struct("BridgeHandle")
            .field("state", &inner.state)
            .field("input", &inner.input)
            .field("buffered", &inner.buffer.len())
            .field("forwarded", &inner.forwarded)
            .finish()
    }
}
