// Coalesced sync triggers: a bounded single-slot mailbox.

use tokio::sync::mpsc;
use tracing::trace;

/// Create the trigger mailbox. Capacity is exactly one: a pending trigger
/// already means "something changed", so further signals add nothing.
pub fn channel() -> (TriggerSlot, mpsc::Receiver<()>) {
    let (tx, rx) = mpsc::channel(1);
    (TriggerSlot { tx }, rx)
}

/// Sending half of the trigger mailbox.
#[derive(Clone)]
pub struct TriggerSlot {
    tx: mpsc::Sender<()>,
}

impl TriggerSlot {
    /// Request a sync. If a trigger is already pending the signal is
    /// dropped; the pending run will pick up these changes too.
    pub fn fire(&self) {
        if self.tx.try_send(()).is_err() {
            trace!("sync trigger already pending");
        }
    }
}
