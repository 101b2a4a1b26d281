//! Submission collection: pluggable store for finalized records
//!
//! - `InMemorySubmissions`: process-lifetime store, the default backend

use std::sync::RwLock;

use crate::types::Submission;

/// Store of finalized submissions
///
/// Implementations must be thread-safe (Send + Sync) for shared access
/// across request tasks.
pub trait SubmissionStore: Send + Sync {
    /// Append a finalized submission
    fn append(&self, submission: Submission) -> Result<(), StorageError>;

    /// All submissions, oldest first
    fn list(&self) -> Result<Vec<Submission>, StorageError>;

    fn len(&self) -> Result<usize, StorageError>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage error: {0}")]
    Storage(String),
}

/// In-memory submission store
///
/// Not durable: data is lost on restart. Oldest records are evicted past
/// `max_submissions`.
pub struct InMemorySubmissions {
    submissions: RwLock<Vec<Submission>>,
    max_submissions: usize,
}

impl InMemorySubmissions {
    pub fn new() -> Self {
        Self::with_limit(10_000)
    }

    pub fn with_limit(max_submissions: usize) -> Self {
        Self {
            submissions: RwLock::new(Vec::new()),
            max_submissions: max_submissions.max(1),
        }
    }
}

impl Default for InMemorySubmissions {
    fn default() -> Self {
        Self::new()
    }
}

impl SubmissionStore for InMemorySubmissions {
    fn append(&self, submission: Submission) -> Result<(), StorageError> {
        let mut store = self
            .submissions
            .write()
            .map_err(|e| StorageError::Storage(e.to_string()))?;

        store.push(submission);

        // Evict oldest if over limit
        if store.len() > self.max_submissions {
            store.remove(0);
        }

        Ok(())
    }

    fn list(&self) -> Result<Vec<Submission>, StorageError> {
        let store = self
            .submissions
            .read()
            .map_err(|e| StorageError::Storage(e.to_string()))?;

        Ok(store.clone())
    }

    fn len(&self) -> Result<usize, StorageError> {
        let store = self
            .submissions
            .read()
            .map_err(|e| StorageError::Storage(e.to_string()))?;

        Ok(store.len())
    }

    fn backend_name(&self) -> &'static str {
        "in-memory"
    }
}
