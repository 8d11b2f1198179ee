//! Outbound event channel for one chat exchange.

use tokio::sync::mpsc;
use tracing::debug;

use crate::stream_event::StreamEvent;

/// Default number of events buffered between the loop and the client.
pub const EVENT_BUFFER: usize = 16;

/// Sending half of a chat's event stream.
///
/// The stream ends when the emitter is closed. `close` consumes the emitter,
/// so it can happen at most once; dropping it without `close` ends the
/// stream the same way.
pub struct EventEmitter {
    tx: mpsc::Sender<StreamEvent>,
    emitted: usize,
}

impl EventEmitter {
    pub fn new(tx: mpsc::Sender<StreamEvent>) -> Self {
        Self { tx, emitted: 0 }
    }

    /// An emitter and the receiver the client reads from.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<StreamEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    /// Send one event. A departed client is not an error; the event is dropped.
    pub async fn emit(&mut self, event: StreamEvent) {
        debug!(event = event.event_type(), "Emitting stream event");
        if self.tx.send(event).await.is_err() {
            debug!("Client disconnected, event dropped");
            return;
        }
        self.emitted += 1;
    }

    /// Events delivered to the channel so far.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// End the stream.
    pub fn close(self) {
        debug!(events = self.emitted, "Closing event stream");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_arrive_in_order_then_stream_ends() {
        let (mut emitter, mut rx) = EventEmitter::channel(4);
        emitter.emit(StreamEvent::tool("fetch_manual")).await;
        emitter.emit(StreamEvent::done()).await;
        assert_eq!(emitter.emitted(), 2);
        emitter.close();

        assert_eq!(rx.recv().await, Some(StreamEvent::tool("fetch_manual")));
        assert_eq!(rx.recv().await, Some(StreamEvent::done()));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn departed_client_is_tolerated() {
        let (mut emitter, rx) = EventEmitter::channel(1);
        drop(rx);
        assert!(emitter.is_closed());
        emitter.emit(StreamEvent::text("nobody listening")).await;
        assert_eq!(emitter.emitted(), 0);
        emitter.close();
    }
}
