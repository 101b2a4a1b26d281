//! Stagecast: staged tool pipeline with live progress broadcasting
//!
//! A submitted text runs through a fixed sequence of remote tool calls.
//! Every stage transition is pushed to all connected observers over SSE.
//!
//! ## Architecture
//!
//! - **Broadcast Registry**: live set of observer connections, best-effort fan-out
//! - **Stage Reporter**: turns pipeline transitions into `stage-update` events
//! - **Pipeline Orchestrator**: primary tool call, then a best-effort dependent call
//! - **Tool Clients**: MCP JSON-RPC over HTTP, one client per remote service
//! - **API**: submission, progress stream and health endpoints

pub mod api;
pub mod broadcast;
pub mod config;
pub mod pipeline;
pub mod storage;
pub mod tools;
pub mod types;

pub use api::{create_app, AppState};
pub use broadcast::{BroadcastRegistry, StageReporter};
pub use config::AppConfig;
pub use pipeline::{PipelineError, PipelineOrchestrator, PipelineOutcome};
pub use storage::{InMemorySubmissions, SubmissionStore};
pub use tools::{AccountContext, McpClientFactory, ToolClient, ToolClientFactory, ToolService};
pub use types::{ProgressMessage, StageEvent, StageStatus, Submission};
