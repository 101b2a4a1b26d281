//! Stage reporter: turns pipeline transitions into broadcast stage events

use std::sync::Arc;
use tracing::{debug, info};

use super::registry::BroadcastRegistry;
use crate::types::{ProgressMessage, StageEvent, StageStatus};

/// Builds stage events and fans them out through the registry
///
/// Reporting is fire-and-forget: it never suspends and never fails, even
/// when no observer receives the event.
#[derive(Clone)]
pub struct StageReporter {
    registry: Arc<BroadcastRegistry>,
}

impl StageReporter {
    pub const fn new(registry: Arc<BroadcastRegistry>) -> Self {
        Self { registry }
    }

    /// Broadcast a `stage-update` for one request
    pub fn report(&self, request_id: &str, stage: &str, message: &str, status: StageStatus) {
        info!(request_id, stage, status = %status, "{}", message);
        let event = StageEvent::new(request_id, stage, message, status);
        self.registry.broadcast(&ProgressMessage::from(event));
    }

    /// Reporting handle bound to one request
    pub fn for_request(&self, request_id: impl Into<String>) -> RequestReporter {
        RequestReporter {
            reporter: self.clone(),
            request_id: request_id.into(),
            closed: false,
        }
    }
}

/// Per-request reporting handle
///
/// Once a `final` or a terminal error has gone out, the request is done and
/// anything reported afterwards is dropped.
pub struct RequestReporter {
    reporter: StageReporter,
    request_id: String,
    closed: bool,
}

impl RequestReporter {
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn in_progress(&mut self, stage: &str, message: &str) {
        self.emit(stage, message, StageStatus::InProgress, false);
    }

    pub fn completed(&mut self, stage: &str, message: &str) {
        self.emit(stage, message, StageStatus::Completed, false);
    }

    /// Non-terminal error: the request keeps going
    pub fn recoverable_error(&mut self, stage: &str, message: &str) {
        self.emit(stage, message, StageStatus::Error, false);
    }

    /// Terminal error: the request is over
    pub fn failed(&mut self, stage: &str, message: &str) {
        self.emit(stage, message, StageStatus::Error, true);
    }

    pub fn finished(&mut self, stage: &str, message: &str) {
        self.emit(stage, message, StageStatus::Final, true);
    }

    fn emit(&mut self, stage: &str, message: &str, status: StageStatus, terminal: bool) {
        if self.closed {
            debug!(
                request_id = %self.request_id,
                stage,
                status = %status,
                "Request already finished, dropping stage event"
            );
            return;
        }
        self.reporter.report(&self.request_id, stage, message, status);
        self.closed = terminal || status == StageStatus::Final;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut tokio::sync::mpsc::Receiver<String>) -> Vec<serde_json::Value> {
        let mut out = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            out.push(serde_json::from_str(&frame).unwrap());
        }
        out
    }

    #[tokio::test]
    async fn test_report_wraps_stage_update() {
        let registry = Arc::new(BroadcastRegistry::new());
        let (_guard, mut rx) = registry.subscribe(8);
        let reporter = StageReporter::new(registry);

        reporter.report("99", "initializing", "Starting process...", StageStatus::InProgress);

        let frames = drain(&mut rx);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["type"], "stage-update");
        assert_eq!(frames[0]["id"], "99");
        assert_eq!(frames[0]["status"], "in-progress");
    }

    #[tokio::test]
    async fn test_report_without_observers_is_silent() {
        let reporter = StageReporter::new(Arc::new(BroadcastRegistry::new()));
        reporter.report("1", "initializing", "Starting process...", StageStatus::InProgress);
    }

    #[tokio::test]
    async fn test_nothing_after_final() {
        let registry = Arc::new(BroadcastRegistry::new());
        let (_guard, mut rx) = registry.subscribe(8);
        let mut request = StageReporter::new(registry).for_request("5");

        request.in_progress("initializing", "Starting process...");
        request.finished("completed", "Done");
        assert!(request.is_closed());
        request.in_progress("late", "should not be sent");

        let frames = drain(&mut rx);
        let stages: Vec<_> = frames.iter().map(|f| f["stage"].as_str().unwrap().to_string()).collect();
        assert_eq!(stages, ["initializing", "completed"]);
    }

    #[tokio::test]
    async fn test_nothing_after_terminal_error() {
        let registry = Arc::new(BroadcastRegistry::new());
        let (_guard, mut rx) = registry.subscribe(8);
        let mut request = StageReporter::new(registry).for_request("6");

        request.failed("calling-primary-tool", "Failed");
        request.finished("completed", "should not be sent");

        let frames = drain(&mut rx);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["status"], "error");
    }

    #[tokio::test]
    async fn test_recoverable_error_keeps_request_open() {
        let registry = Arc::new(BroadcastRegistry::new());
        let (_guard, mut rx) = registry.subscribe(8);
        let mut request = StageReporter::new(registry).for_request("7");

        request.recoverable_error("filestore-error", "Storage failed, continuing");
        assert!(!request.is_closed());
        request.finished("completed", "Done");

        let frames = drain(&mut rx);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1]["status"], "final");
    }
}
