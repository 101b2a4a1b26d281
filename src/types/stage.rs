//! Stage events: the unit of progress reporting for a pipeline run

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::ValidationError;

/// Handshake text sent to every observer when its channel opens
pub const CONNECTED_MESSAGE: &str = "SSE connection established";

/// Current time in the ISO-8601 form observers expect (`2026-01-01T00:00:00.000Z`)
pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ============================================================================
// Stage Status
// ============================================================================

/// Status carried by a stage event
///
/// The five values and their kebab-case wire names are fixed; observers
/// match on them verbatim.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum StageStatus {
    Pending,
    InProgress,
    Completed,
    Error,
    /// Last event of a request
    Final,
}

impl StageStatus {
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::InProgress,
        Self::Completed,
        Self::Error,
        Self::Final,
    ];

    /// Wire name of the status
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Final => "final",
        }
    }
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownStatus(s.to_string()))
    }
}

// ============================================================================
// Stage Event
// ============================================================================

/// One discrete, immutable transition in processing a single request
///
/// Serialized as `{id, stage, message, timestamp, status}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageEvent {
    #[serde(rename = "id")]
    request_id: String,
    stage: String,
    message: String,
    timestamp: String,
    status: StageStatus,
}

impl StageEvent {
    /// Build an event stamped with the current time
    pub fn new(
        request_id: impl Into<String>,
        stage: impl Into<String>,
        message: impl Into<String>,
        status: StageStatus,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            stage: stage.into(),
            message: message.into(),
            timestamp: now_iso8601(),
            status,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub const fn status(&self) -> StageStatus {
        self.status
    }
}

// ============================================================================
// Observer Envelope
// ============================================================================

/// Envelope pushed to observers, discriminated by `type`
///
/// ```text
/// {"type":"connected","message":"SSE connection established"}
/// {"type":"stage-update","id":"...","stage":"...","message":"...","timestamp":"...","status":"..."}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ProgressMessage {
    /// Handshake, sent once when an observer subscribes
    Connected { message: String },
    /// A stage transition of some request
    StageUpdate(StageEvent),
}

impl ProgressMessage {
    pub fn connected() -> Self {
        Self::Connected {
            message: CONNECTED_MESSAGE.to_string(),
        }
    }

    /// The wrapped stage event, if this is a stage update
    pub const fn stage_event(&self) -> Option<&StageEvent> {
        match self {
            Self::StageUpdate(event) => Some(event),
            Self::Connected { .. } => None,
        }
    }
}

impl From<StageEvent> for ProgressMessage {
    fn from(event: StageEvent) -> Self {
        Self::StageUpdate(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        let names: Vec<String> = StageStatus::ALL
            .iter()
            .map(|s| serde_json::to_value(s).unwrap().as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["pending", "in-progress", "completed", "error", "final"]);
    }

    #[test]
    fn test_status_from_str_roundtrips_display() {
        for status in StageStatus::ALL {
            assert_eq!(status.to_string().parse::<StageStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_status_from_str_rejects_unknown() {
        let err = "done".parse::<StageStatus>().unwrap_err();
        assert_eq!(err, ValidationError::UnknownStatus("done".to_string()));
        assert!("In-Progress".parse::<StageStatus>().is_err());
    }

    #[test]
    fn test_stage_event_is_timestamped() {
        let event = StageEvent::new("42", "initializing", "Starting process...", StageStatus::InProgress);
        assert_eq!(event.request_id(), "42");
        assert_eq!(event.stage(), "initializing");
        assert!(chrono::DateTime::parse_from_rfc3339(event.timestamp()).is_ok());
        assert!(event.timestamp().ends_with('Z'));
    }

    #[test]
    fn test_stage_update_envelope_shape() {
        let event = StageEvent::new("7", "creating-clients", "Initializing clients...", StageStatus::InProgress);
        let v = serde_json::to_value(ProgressMessage::from(event)).unwrap();

        assert_eq!(v["type"], "stage-update");
        assert_eq!(v["id"], "7");
        assert_eq!(v["stage"], "creating-clients");
        assert_eq!(v["message"], "Initializing clients...");
        assert_eq!(v["status"], "in-progress");
        assert!(v["timestamp"].is_string());
        assert!(v.get("request_id").is_none());
    }

    #[test]
    fn test_connected_envelope_shape() {
        let v = serde_json::to_value(ProgressMessage::connected()).unwrap();
        assert_eq!(v, serde_json::json!({"type": "connected", "message": CONNECTED_MESSAGE}));
    }

    #[test]
    fn test_envelope_parses_back() {
        let raw = r#"{"type":"stage-update","id":"1","stage":"completed","message":"done","timestamp":"2026-01-01T00:00:00.000Z","status":"final"}"#;
        let msg: ProgressMessage = serde_json::from_str(raw).unwrap();
        let event = msg.stage_event().unwrap();
        assert_eq!(event.status(), StageStatus::Final);
        assert_eq!(event.stage(), "completed");
    }
}
