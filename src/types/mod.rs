//! Shared data structures for the staged tool-call pipeline
//!
//! - `StageEvent` / `StageStatus`: one observable transition of a request
//! - `ProgressMessage`: the envelope pushed to observers (`stage-update` or `connected`)
//! - `Submission`: the record a pipeline run builds and finalizes

mod error;
mod stage;
mod submission;

pub use error::*;
pub use stage::*;
pub use submission::*;
