//! Validation errors raised before any pipeline work starts

/// Input rejected at the boundary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Text is required")]
    EmptyText,
    #[error("Unrecognized stage status: {0}")]
    UnknownStatus(String),
}
