//! Progress channel: long-lived SSE stream of stage events
//!
//! Each `GET /api/progress` registers one observer connection. The stream
//! opens with the `connected` handshake, then relays every broadcast frame.
//! The connection is deregistered when the response stream is dropped.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use futures::stream::{self, Stream, StreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::AppState;
use crate::broadcast::BroadcastRegistry;
use crate::types::ProgressMessage;

/// GET /api/progress
pub async fn subscribe(State(state): State<AppState>) -> impl IntoResponse {
    let stream = observer_stream(&state.registry, state.observer_buffer, state.shutdown.clone());
    Sse::new(stream).keep_alive(KeepAlive::new().interval(state.keep_alive))
}

/// OPTIONS /api/progress
///
/// CORS headers come from the router's CORS layer. No connection is opened.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// Register an observer and build the event stream feeding it
///
/// The stream ends when `shutdown` is cancelled.
pub fn observer_stream(
    registry: &Arc<BroadcastRegistry>,
    buffer: usize,
    shutdown: CancellationToken,
) -> impl Stream<Item = Result<Event, axum::Error>> + Send + 'static {
    let (guard, rx) = registry.subscribe(buffer);
    info!(connection = %guard.id(), observers = registry.len(), "Observer connected");

    let handshake = stream::once(async { Event::default().json_data(ProgressMessage::connected()) });

    // The guard lives in the stream state, so dropping the stream deregisters
    let updates = stream::unfold((guard, rx), |(guard, mut rx)| async move {
        let frame = rx.recv().await?;
        Some((Ok(Event::default().data(frame)), (guard, rx)))
    });

    handshake
        .chain(updates)
        .take_until(shutdown.cancelled_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{StageEvent, StageStatus};

    fn sample() -> ProgressMessage {
        StageEvent::new("1", "initializing", "Starting process...", StageStatus::InProgress).into()
    }

    #[tokio::test]
    async fn test_stream_registers_and_deregisters() {
        let registry = Arc::new(BroadcastRegistry::new());
        let stream = observer_stream(&registry, 8, CancellationToken::new());
        assert_eq!(registry.len(), 1);

        drop(stream);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_stream_yields_handshake_then_updates() {
        let registry = Arc::new(BroadcastRegistry::new());
        let mut stream = Box::pin(observer_stream(&registry, 8, CancellationToken::new()));

        assert!(stream.next().await.unwrap().is_ok());

        registry.broadcast(&sample());
        assert!(stream.next().await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_stream_waits_for_broadcast() {
        let registry = Arc::new(BroadcastRegistry::new());
        let mut stream = Box::pin(observer_stream(&registry, 8, CancellationToken::new()));
        assert!(stream.next().await.is_some());

        let mut next = tokio_test::task::spawn(stream.next());
        tokio_test::assert_pending!(next.poll());

        registry.broadcast(&sample());
        assert!(next.is_woken());
        assert!(tokio_test::assert_ready!(next.poll()).is_some());
    }

    #[tokio::test]
    async fn test_shutdown_ends_stream() {
        let registry = Arc::new(BroadcastRegistry::new());
        let token = CancellationToken::new();
        let mut stream = Box::pin(observer_stream(&registry, 8, token.clone()));

        assert!(stream.next().await.is_some());
        token.cancel();
        assert!(stream.next().await.is_none());

        drop(stream);
        assert!(registry.is_empty());
    }
}
