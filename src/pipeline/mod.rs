//! Staged Tool-Call Pipeline
//!
//! ## Stage Sequence (one request)
//!
//! ```text
//! STAGE 1: initializing            (in-progress)
//! STAGE 2: creating-clients        (in-progress)   no remote call
//! STAGE 3: calling-primary-tool    (in-progress → completed | error, fatal)
//! STAGE 4: calling-dependent-tool  (in-progress → completed | filestore-error, recovered)
//! STAGE 5: completed               (final)
//! ```
//!
//! CRITICAL GUARANTEE: Stage 4 ONLY runs if Stage 3 produced an artifact.
//! A Stage 4 failure degrades the record but never fails the request.

mod error;
mod orchestrator;
pub mod stages;

pub use error::PipelineError;
pub use orchestrator::{PipelineOrchestrator, PipelineOutcome};
