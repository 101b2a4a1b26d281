//! Pipeline errors surfaced to the submitting caller

use crate::storage::StorageError;
use crate::tools::ToolError;
use crate::types::ValidationError;

/// Errors that fail a submission
///
/// Dependent-step failures never appear here: they are recovered inside
/// the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Failed to initialize {service} client")]
    ClientSetup {
        service: String,
        #[source]
        source: ToolError,
    },
    #[error("Failed to call {service} tool")]
    PrimaryStage {
        service: String,
        #[source]
        source: ToolError,
    },
    #[error("Failed to save submission")]
    Storage(#[from] StorageError),
}

impl PipelineError {
    /// Machine-readable kind for error payloads
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::ClientSetup { .. } => "client_setup",
            Self::PrimaryStage { .. } => "primary_stage",
            Self::Storage(_) => "storage",
        }
    }

    /// Underlying cause, when there is one worth showing the caller
    pub fn details(&self) -> Option<String> {
        match self {
            Self::Validation(_) => None,
            Self::ClientSetup { source, .. } | Self::PrimaryStage { source, .. } => {
                Some(source.to_string())
            }
            Self::Storage(e) => Some(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_and_details() {
        let err = PipelineError::from(ValidationError::EmptyText);
        assert_eq!(err.kind(), "validation");
        assert_eq!(err.to_string(), "Text is required");
        assert_eq!(err.details(), None);

        let err = PipelineError::PrimaryStage {
            service: "image".to_string(),
            source: ToolError::ToolFailed("quota exceeded".to_string()),
        };
        assert_eq!(err.kind(), "primary_stage");
        assert_eq!(err.to_string(), "Failed to call image tool");
        assert_eq!(err.details().as_deref(), Some("Tool reported an error: quota exceeded"));
    }
}
