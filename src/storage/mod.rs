//! Submission Storage
//!
//! Process-lifetime storage for finalized submissions and the id source
//! shared by submissions and their progress events.

mod ids;
mod submissions;

pub use ids::IdGenerator;
pub use submissions::{InMemorySubmissions, StorageError, SubmissionStore};
