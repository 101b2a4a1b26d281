//! Broadcast registry: the live set of observer connections

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use super::sink::{ChannelSink, DeliveryError, ObserverSink};
use crate::types::ProgressMessage;

/// Identity of one registered observer connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "observer-{}", self.0)
    }
}

/// Live set of observer connections
///
/// Shared between the progress endpoint (register/deregister) and every
/// in-flight pipeline (broadcast). Writes are best-effort: `broadcast` never
/// returns an error, and a connection whose transport is gone is dropped
/// from the set on the spot.
#[derive(Default)]
pub struct BroadcastRegistry {
    connections: DashMap<ConnectionId, Arc<dyn ObserverSink>>,
    next_id: AtomicU64,
}

impl BroadcastRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to the live set
    pub fn register(&self, sink: Arc<dyn ObserverSink>) -> ConnectionId {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.connections.insert(id, sink);
        debug!(connection = %id, observers = self.connections.len(), "Observer registered");
        id
    }

    /// Remove a connection. Returns false if it was not registered.
    pub fn deregister(&self, id: ConnectionId) -> bool {
        let removed = self.connections.remove(&id).is_some();
        if removed {
            debug!(connection = %id, observers = self.connections.len(), "Observer deregistered");
        }
        removed
    }

    /// Write a message to every registered connection
    ///
    /// The message is serialized once. A failing write is logged and does not
    /// stop delivery to the remaining connections.
    pub fn broadcast(&self, message: &ProgressMessage) {
        let frame = match serde_json::to_string(message) {
            Ok(frame) => frame,
            Err(e) => {
                error!(error = %e, "Failed to serialize progress message");
                return;
            }
        };

        // Snapshot so no shard lock is held while sinks run
        let targets: Vec<(ConnectionId, Arc<dyn ObserverSink>)> = self
            .connections
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();

        let mut delivered = 0usize;
        for (id, sink) in &targets {
            match sink.deliver(&frame) {
                Ok(()) => delivered += 1,
                Err(DeliveryError::Full) => {
                    warn!(connection = %id, "Observer buffer full, dropping progress message");
                }
                Err(DeliveryError::Closed) => {
                    debug!(connection = %id, "Observer gone, removing from registry");
                    self.deregister(*id);
                }
            }
        }

        debug!(
            observers = targets.len(),
            delivered,
            "Broadcast progress message"
        );
    }

    /// Open a channel-backed connection and register it
    ///
    /// The returned guard deregisters the connection when dropped, so the
    /// transport only has to keep the guard alive as long as it streams.
    pub fn subscribe(
        self: &Arc<Self>,
        capacity: usize,
    ) -> (ObserverGuard, mpsc::Receiver<String>) {
        let (sink, rx) = ChannelSink::channel(capacity);
        let id = self.register(Arc::new(sink));
        (
            ObserverGuard {
                registry: Arc::clone(self),
                id,
            },
            rx,
        )
    }

    /// Number of live connections
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

/// Deregisters its connection exactly once, on drop
pub struct ObserverGuard {
    registry: Arc<BroadcastRegistry>,
    id: ConnectionId,
}

impl ObserverGuard {
    pub const fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ObserverGuard {
    fn drop(&mut self) {
        self.registry.deregister(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{StageEvent, StageStatus};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    /// Counts write attempts; optionally fails every write
    struct RecordingSink {
        attempts: AtomicUsize,
        frames: Mutex<Vec<String>>,
        fail_with: Option<DeliveryError>,
    }

    impl RecordingSink {
        fn ok() -> Arc<Self> {
            Arc::new(Self {
                attempts: AtomicUsize::new(0),
                frames: Mutex::new(Vec::new()),
                fail_with: None,
            })
        }

        fn failing(err: DeliveryError) -> Arc<Self> {
            Arc::new(Self {
                attempts: AtomicUsize::new(0),
                frames: Mutex::new(Vec::new()),
                fail_with: Some(err),
            })
        }

        fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    impl ObserverSink for RecordingSink {
        fn deliver(&self, frame: &str) -> Result<(), DeliveryError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = self.fail_with {
                return Err(err);
            }
            self.frames.lock().unwrap().push(frame.to_string());
            Ok(())
        }
    }

    fn sample_message() -> ProgressMessage {
        StageEvent::new("1", "initializing", "Starting process...", StageStatus::InProgress).into()
    }

    #[test]
    fn test_register_and_deregister() {
        let registry = BroadcastRegistry::new();
        let a = registry.register(RecordingSink::ok());
        let b = registry.register(RecordingSink::ok());
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);

        assert!(registry.deregister(a));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_deregister_is_idempotent() {
        let registry = BroadcastRegistry::new();
        let sink = RecordingSink::ok();
        let id = registry.register(sink.clone());

        assert!(registry.deregister(id));
        assert!(!registry.deregister(id));
        assert!(!registry.deregister(ConnectionId(999)));
        assert!(registry.is_empty());

        registry.broadcast(&sample_message());
        assert_eq!(sink.attempts(), 0);
    }

    #[test]
    fn test_broadcast_reaches_every_observer_once() {
        let registry = BroadcastRegistry::new();
        let sinks: Vec<_> = (0..5).map(|_| RecordingSink::ok()).collect();
        for sink in &sinks {
            registry.register(sink.clone());
        }

        registry.broadcast(&sample_message());

        for sink in &sinks {
            assert_eq!(sink.attempts(), 1);
            let frames = sink.frames.lock().unwrap();
            let v: serde_json::Value = serde_json::from_str(&frames[0]).unwrap();
            assert_eq!(v["type"], "stage-update");
            assert_eq!(v["stage"], "initializing");
        }
    }

    #[test]
    fn test_failing_observer_does_not_block_others() {
        let registry = BroadcastRegistry::new();
        let before = RecordingSink::ok();
        let broken = RecordingSink::failing(DeliveryError::Full);
        let after = RecordingSink::ok();
        registry.register(before.clone());
        registry.register(broken.clone());
        registry.register(after.clone());

        registry.broadcast(&sample_message());

        assert_eq!(before.attempts(), 1);
        assert_eq!(broken.attempts(), 1);
        assert_eq!(after.attempts(), 1);
        // A full buffer only loses the frame
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_closed_observer_is_removed() {
        let registry = BroadcastRegistry::new();
        let live = RecordingSink::ok();
        let gone = RecordingSink::failing(DeliveryError::Closed);
        registry.register(live.clone());
        registry.register(gone.clone());

        registry.broadcast(&sample_message());
        assert_eq!(registry.len(), 1);

        registry.broadcast(&sample_message());
        assert_eq!(live.attempts(), 2);
        assert_eq!(gone.attempts(), 1);
    }

    #[test]
    fn test_late_observer_gets_no_replay() {
        let registry = BroadcastRegistry::new();
        registry.broadcast(&sample_message());

        let late = RecordingSink::ok();
        registry.register(late.clone());
        assert_eq!(late.attempts(), 0);
    }

    #[tokio::test]
    async fn test_subscribe_guard_deregisters_on_drop() {
        let registry = Arc::new(BroadcastRegistry::new());
        let (guard, mut rx) = registry.subscribe(8);
        assert_eq!(registry.len(), 1);

        registry.broadcast(&sample_message());
        let frame = rx.recv().await.unwrap();
        assert!(frame.contains("\"stage-update\""));

        drop(guard);
        assert!(registry.is_empty());
    }
}
