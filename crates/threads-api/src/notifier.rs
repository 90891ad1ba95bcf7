use tokio::sync::broadcast;
use tracing::trace;

use threads_types::events::RealtimeEvent;

const CHANNEL_CAPACITY: usize = 1024;

/// Fans realtime events out to every connected client.
#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<RealtimeEvent>,
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RealtimeEvent> {
        self.tx.subscribe()
    }

    /// Send to all subscribers. Having none is not an error.
    pub fn publish(&self, event: RealtimeEvent) {
        trace!("Publishing {:?}", event);
        let _ = self.tx.send(event);
    }

    /// Tell clients showing `path` to refetch it.
    pub fn revalidate(&self, path: Option<String>) {
        if let Some(path) = path {
            self.publish(RealtimeEvent::Revalidate { path });
        }
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
