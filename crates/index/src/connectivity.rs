//! Online/offline state shared between the indexer and its callers.

use std::sync::Arc;
use tokio::sync::watch;

/// Connectivity monitor.
///
/// Cloning yields another handle onto the same state. Subscribers are only
/// woken by actual transitions; setting the current state again is a no-op.
#[derive(Debug, Clone)]
pub struct Connectivity {
    sender: Arc<watch::Sender<bool>>,
}

impl Connectivity {
    pub fn new(online: bool) -> Self {
        let (sender, _) = watch::channel(online);
        Self { sender: Arc::new(sender) }
    }

    pub fn is_online(&self) -> bool {
        *self.sender.borrow()
    }

    /// Publish the current state. Returns `true` if it changed.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.sender.send_if_modified(|current| {
            if *current == online {
                return false;
            }
            *current = online;
            true
        });
        if changed {
            tracing::info!(online, "Connectivity changed");
        }
        changed
    }

    /// Receiver that observes every later transition.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_transitions_notify_subscribers() {
        let connectivity = Connectivity::new(true);
        let mut rx = connectivity.subscribe();
        assert!(!connectivity.set_online(true));
        assert!(!rx.has_changed().unwrap());

        assert!(connectivity.set_online(false));
        rx.changed().await.unwrap();
        assert!(!*rx.borrow_and_update());
        assert!(!connectivity.is_online());
    }

    #[test]
    fn test_clones_share_state() {
        let a = Connectivity::default();
        let b = a.clone();
        b.set_online(false);
        assert!(!a.is_online());
    }
}
