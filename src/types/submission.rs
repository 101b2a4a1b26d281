//! Submission record built by a pipeline run

use serde::{Deserialize, Serialize};

use super::{now_iso8601, ValidationError};

/// The result entity a pipeline run accumulates
///
/// Enrichment fields start empty and are filled by successful tool calls.
/// A record reaches the submission collection exactly once, when the run
/// finalizes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: u64,
    pub text: String,
    pub timestamp: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub file_name: String,
}

impl Submission {
    /// Start a record for already-validated text
    pub fn new(id: u64, text: &str) -> Self {
        Self {
            id,
            text: text.trim().to_string(),
            timestamp: now_iso8601(),
            image_url: String::new(),
            file_name: String::new(),
        }
    }

    /// Whether the dependent (file storage) step populated this record
    pub fn has_stored_file(&self) -> bool {
        !self.file_name.is_empty()
    }
}

/// Trim submitted text, rejecting missing or blank input
pub fn validate_text(raw: Option<&str>) -> Result<&str, ValidationError> {
    match raw.map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text),
        _ => Err(ValidationError::EmptyText),
    }
}
