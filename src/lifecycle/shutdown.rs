//! Shutdown coordination between the signal handler, the HTTP server and
//! the store.

use tokio::sync::broadcast;

/// Fan-out shutdown signal.
///
/// The server and any background task subscribe; `trigger` notifies all of
/// them at once. Triggering twice is harmless. Clones share one channel, so
/// the signal handler can own a clone while `main` keeps subscribing.
#[derive(Clone)]
pub struct Shutdown {
    /// Sender half; receivers are handed out by `subscribe`.
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    /// Create a coordinator with no subscribers yet.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Receiver that resolves once `trigger` is called.
    ///
    /// Subscribe before spawning anything that may trigger, or the signal
    /// can be missed.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Notify every current subscriber. A no-op when nobody listens.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Number of subscribers that have not yet dropped their receiver.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
