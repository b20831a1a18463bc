//! Cooperative shutdown for background tasks.

use tokio::sync::broadcast;

/// Fans a single stop request out to every background task.
///
/// Tasks hold a receiver and check it at each tick boundary. Dropping the
/// last signal closes the channel, which receivers also treat as a stop.
#[derive(Clone, Debug)]
pub struct ShutdownSignal {
    sender: broadcast::Sender<()>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self { sender }
    }

    /// Receiver for a task spawned from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.sender.subscribe()
    }

    /// Ask every subscribed task to stop.
    pub fn shutdown(&self) {
        let _ = self.sender.send(());
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}
