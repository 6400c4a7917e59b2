use log::info;
use tokio::sync::{mpsc, watch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkEvent {
    Online,
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    GoneOnline,
    GoneOffline,
}

/// Tracks whether the platform currently reports connectivity.
#[derive(Debug, Clone, Copy)]
pub struct NetworkMonitor {
    is_offline: bool,
}

impl NetworkMonitor {
    pub fn new(online_at_start: bool) -> Self {
        NetworkMonitor {
            is_offline: !online_at_start,
        }
    }

    pub fn is_offline(&self) -> bool {
        self.is_offline
    }

    /// Applies a platform signal. Signals that don't change the state are ignored.
    pub fn apply(&mut self, event: NetworkEvent) -> Option<Transition> {
        match (event, self.is_offline) {
            (NetworkEvent::Online, true) => {
                self.is_offline = false;
                info!("Connectivity restored");
                Some(Transition::GoneOnline)
            }
            (NetworkEvent::Offline, false) => {
                self.is_offline = true;
                info!("Connectivity lost");
                Some(Transition::GoneOffline)
            }
            _ => None,
        }
    }
}

/// Turns a watched "online" flag into discrete events.
///
/// The initial value is not emitted; it seeds the monitor instead.
pub fn watch_connectivity(mut online: watch::Receiver<bool>) -> mpsc::Receiver<NetworkEvent> {
    let (tx, rx) = mpsc::channel(8);
    tokio::spawn(async move {
        while online.changed().await.is_ok() {
            let event = if *online.borrow_and_update() {
                NetworkEvent::Online
            } else {
                NetworkEvent::Offline
            };
            if tx.send(event).await.is_err() {
                break;
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_from_platform_signal() {
        assert!(NetworkMonitor::new(false).is_offline());
        assert!(!NetworkMonitor::new(true).is_offline());
    }

    #[test]
    fn only_real_changes_produce_transitions() {
        let mut monitor = NetworkMonitor::new(true);
        assert_eq!(monitor.apply(NetworkEvent::Online), None);
        assert_eq!(monitor.apply(NetworkEvent::Offline), Some(Transition::GoneOffline));
        assert_eq!(monitor.apply(NetworkEvent::Offline), None);
        assert!(monitor.is_offline());
        assert_eq!(monitor.apply(NetworkEvent::Online), Some(Transition::GoneOnline));
        assert!(!monitor.is_offline());
    }

    #[tokio::test]
    async fn watch_channel_emits_changes() {
        let (tx, rx) = watch::channel(true);
        let mut events = watch_connectivity(rx);

        tx.send(false).unwrap();
        assert_eq!(events.recv().await, Some(NetworkEvent::Offline));
        tx.send(true).unwrap();
        assert_eq!(events.recv().await, Some(NetworkEvent::Online));

        drop(tx);
        assert_eq!(events.recv().await, None);
    }
}
