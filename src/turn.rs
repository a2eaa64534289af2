use tokio::sync::broadcast;

/// Process-wide "speech finished" signal. The conversation controller
/// subscribes at startup and starts a listening phase on each event.
/// Delivery is at-least-once to live subscribers and never more than once
/// per completed delivery; a lagging or absent subscriber never blocks
/// the announcing side.
#[derive(Clone)]
pub struct TurnNotifier {
    tx: broadcast::Sender<()>,
}

impl TurnNotifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    pub fn announce(&self) {
        // Err just means nobody is listening right now.
        let _ = self.tx.send(());
    }
}

impl Default for TurnNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_announce_reaches_all_subscribers() {
        let notifier = TurnNotifier::new();
        let mut a = notifier.subscribe();
        let mut b = notifier.subscribe();

        notifier.announce();

        assert!(a.recv().await.is_ok());
        assert!(b.recv().await.is_ok());
    }

    #[test]
    fn test_announce_without_subscribers_is_harmless() {
        let notifier = TurnNotifier::new();
        notifier.announce();
    }
}
