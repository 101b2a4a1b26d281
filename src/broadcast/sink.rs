//! Observer sinks: the write side of one observer connection

use tokio::sync::mpsc;

/// Why a single write to an observer did not land
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The observer is not draining fast enough; this frame is dropped
    #[error("observer buffer full")]
    Full,
    /// The observer's transport is gone
    #[error("observer disconnected")]
    Closed,
}

/// Write-capable handle to one observer
///
/// `deliver` must not block: it is called from inside a fan-out loop that
/// runs on the pipeline's task.
pub trait ObserverSink: Send + Sync {
    fn deliver(&self, frame: &str) -> Result<(), DeliveryError>;
}

/// Sink backed by a bounded channel whose receiver drives an SSE response
pub struct ChannelSink {
    tx: mpsc::Sender<String>,
}

impl ChannelSink {
    /// Create a sink and the receiver that the transport drains
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl ObserverSink for ChannelSink {
    fn deliver(&self, frame: &str) -> Result<(), DeliveryError> {
        self.tx.try_send(frame.to_string()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_sink_delivers_in_order() {
        let (sink, mut rx) = ChannelSink::channel(4);
        sink.deliver("a").unwrap();
        sink.deliver("b").unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some("a"));
        assert_eq!(rx.recv().await.as_deref(), Some("b"));
    }

    #[test]
    fn test_channel_sink_full() {
        let (sink, _rx) = ChannelSink::channel(1);
        sink.deliver("a").unwrap();
        assert_eq!(sink.deliver("b"), Err(DeliveryError::Full));
    }

    #[test]
    fn test_channel_sink_closed() {
        let (sink, rx) = ChannelSink::channel(1);
        drop(rx);
        assert_eq!(sink.deliver("a"), Err(DeliveryError::Closed));
    }
}
