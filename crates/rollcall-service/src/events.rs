//! In-process fan-out of admission events.

use rollcall_core::attendance::{AdmissionEvent, EventSink};
use tokio::sync::broadcast;

/// Default number of events a slow subscriber may lag behind before it starts
/// missing them.
pub const DEFAULT_CAPACITY: usize = 256;

/// Publishes every [`AdmissionEvent`] on a `tokio` broadcast channel.
///
/// Publishing never blocks and never fails: with no subscribers the event is
/// dropped, and lagging subscribers observe `RecvError::Lagged`.
#[derive(Debug, Clone)]
pub struct BroadcastEvents {
  tx: broadcast::Sender<AdmissionEvent>,
}

impl BroadcastEvents {
  pub fn new(capacity: usize) -> Self {
    let (tx, _) = broadcast::channel(capacity);
    Self { tx }
  }

  pub fn subscribe(&self) -> broadcast::Receiver<AdmissionEvent> { self.tx.subscribe() }
}

impl Default for BroadcastEvents {
  fn default() -> Self { Self::new(DEFAULT_CAPACITY) }
}

impl EventSink for BroadcastEvents {
  fn publish(&self, event: AdmissionEvent) {
    // Err only means nobody is listening.
    let _ = self.tx.send(event);
  }
}
