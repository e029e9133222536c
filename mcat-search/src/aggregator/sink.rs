//! Stream sink
//!
//! The single output channel of one search. The HTTP layer holds the
//! receiving half and turns it into the response body; when the client goes
//! away the body is dropped, the receiver with it, and the sink observes the
//! channel as closed.
//!
//! Writes and closes never fail loudly: once closed (locally or by the
//! remote side), every further write is a no-op returning `false`.

use tokio::sync::mpsc;
use tracing::debug;

use super::events::SearchEvent;

/// Receiving half of a search stream
pub type EventReceiver = mpsc::UnboundedReceiver<SearchEvent>;

/// Writable end of a search stream
#[derive(Debug)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<SearchEvent>>,
}

impl EventSink {
    /// Create a connected sink/receiver pair
    pub fn channel() -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// Whether the sink is still writable
    ///
    /// False after `close()` or once the receiving side has been dropped.
    pub fn is_open(&self) -> bool {
        self.tx.as_ref().is_some_and(|tx| !tx.is_closed())
    }

    /// Write one event
    ///
    /// Returns `true` when the event was handed to the receiver. A write to a
    /// closed sink returns `false`; a write that discovers the remote side
    /// has gone closes the sink.
    pub fn write(&mut self, event: SearchEvent) -> bool {
        let Some(tx) = self.tx.as_ref() else {
            return false;
        };

        match tx.send(event) {
            Ok(()) => true,
            Err(rejected) => {
                debug!(event = rejected.0.kind(), "Stream receiver gone, closing sink");
                self.tx = None;
                false
            }
        }
    }

    /// Close the sink; idempotent
    ///
    /// Dropping the sender ends the stream on the receiving side once the
    /// already-written events are drained.
    pub fn close(&mut self) {
        self.tx = None;
    }
}
