//! Coarse change notification for presentation layers.
//!
//! Every successful mutation sends one payload-free [`StateChanged`];
//! subscribers re-read whatever lists they show.

use tokio::sync::broadcast;

/// "Something in the library changed, re-pull your lists."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChanged;

#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    tx: broadcast::Sender<StateChanged>,
}

impl ChangeNotifier {
    /// Create a notifier buffering up to `capacity` unread signals per
    /// subscriber (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateChanged> {
        self.tx.subscribe()
    }

    /// Fire the signal. Having no subscribers is not an error.
    pub fn notify(&self) {
        let _ = self.tx.send(StateChanged);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
