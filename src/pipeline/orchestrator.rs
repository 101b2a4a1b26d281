//! Pipeline Orchestrator - drives one submission through the tool-call stages
//!
//! ```text
//! initializing → creating-clients → calling-primary-tool ─┬─ error → failed
//!                                                         └─ ok → calling-dependent-tool ─┬─ ok    → completed
//!                                                                                         └─ error → completed (degraded)
//! ```
//!
//! Every transition is reported through the request's `RequestReporter`.

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use super::error::PipelineError;
use super::stages;
use crate::broadcast::{RequestReporter, StageReporter};
use crate::storage::{IdGenerator, SubmissionStore};
use crate::tools::{AccountContext, Artifact, ToolClient, ToolClientFactory, ToolError, ToolService};
use crate::types::{validate_text, Submission};

/// Result of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome {
    pub submission: Submission,
    /// The dependent step failed and the record only carries primary fields
    pub degraded: bool,
}

/// Runs submissions through the primary and dependent tool services
pub struct PipelineOrchestrator {
    reporter: StageReporter,
    clients: Arc<dyn ToolClientFactory>,
    account: AccountContext,
    primary: ToolService,
    dependent: ToolService,
    store: Arc<dyn SubmissionStore>,
    ids: IdGenerator,
    call_timeout: Option<Duration>,
}

impl PipelineOrchestrator {
    pub fn new(
        reporter: StageReporter,
        clients: Arc<dyn ToolClientFactory>,
        account: AccountContext,
        primary: ToolService,
        dependent: ToolService,
        store: Arc<dyn SubmissionStore>,
    ) -> Self {
        info!(
            primary = %primary.name,
            primary_endpoint = %primary.endpoint,
            dependent = %dependent.name,
            dependent_endpoint = %dependent.endpoint,
            store = store.backend_name(),
            "Initializing pipeline orchestrator"
        );

        Self {
            reporter,
            clients,
            account,
            primary,
            dependent,
            store,
            ids: IdGenerator::new(),
            call_timeout: None,
        }
    }

    /// Bound every tool call by `timeout` (None waits indefinitely)
    #[must_use]
    pub const fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<dyn SubmissionStore> {
        &self.store
    }

    /// Validate the text and run it through every stage
    ///
    /// Blank input is rejected before any stage event is emitted.
    pub async fn submit(&self, raw_text: Option<&str>) -> Result<PipelineOutcome, PipelineError> {
        let text = validate_text(raw_text)?;
        let id = self.ids.next_id();
        let mut progress = self.reporter.for_request(id.to_string());
        self.run(&mut progress, id, text).await
    }

    async fn run(
        &self,
        progress: &mut RequestReporter,
        id: u64,
        text: &str,
    ) -> Result<PipelineOutcome, PipelineError> {
        // STAGE 1
        progress.in_progress(stages::INITIALIZING, "Starting process...");
        let mut submission = Submission::new(id, text);

        // STAGE 2: handles only, no remote call
        progress.in_progress(stages::CREATING_CLIENTS, "Initializing tool clients...");
        let (primary_client, dependent_client) = match self.connect_clients().await {
            Ok(clients) => clients,
            Err(err) => {
                error!(request_id = id, error = %err, "Failed to initialize tool clients");
                progress.failed(stages::CREATING_CLIENTS, "Failed to initialize tool clients!");
                return Err(err);
            }
        };

        // STAGE 3: required
        progress.in_progress(
            stages::CALLING_PRIMARY_TOOL,
            &format!("Calling {} tool...", self.primary.name),
        );
        let artifact = match self.invoke(primary_client.as_ref(), &self.primary, text).await {
            Ok(artifact) => artifact,
            Err(source) => {
                error!(
                    request_id = id,
                    service = %self.primary.name,
                    error = %source,
                    "Primary tool call failed"
                );
                progress.failed(
                    stages::CALLING_PRIMARY_TOOL,
                    &format!("Failed to call {} tool!", self.primary.name),
                );
                return Err(PipelineError::PrimaryStage {
                    service: self.primary.name.clone(),
                    source,
                });
            }
        };
        progress.completed(
            stages::CALLING_PRIMARY_TOOL,
            &format!("{} tool call completed!", self.primary.name),
        );
        submission.image_url.clone_from(&artifact.url);

        // STAGE 4: best-effort
        progress.in_progress(
            stages::CALLING_DEPENDENT_TOOL,
            &format!("Calling {} tool...", self.dependent.name),
        );
        let degraded = match self
            .invoke(dependent_client.as_ref(), &self.dependent, &artifact.url)
            .await
        {
            Ok(enriched) => {
                progress.completed(
                    stages::CALLING_DEPENDENT_TOOL,
                    &format!("{} tool call completed!", self.dependent.name),
                );
                merge_enrichment(&mut submission, enriched);
                false
            }
            Err(err) => {
                warn!(
                    request_id = id,
                    service = %self.dependent.name,
                    error = %err,
                    "Dependent tool call failed, continuing with primary result"
                );
                progress.recoverable_error(
                    &self.dependent.fallback_stage,
                    &format!(
                        "Failed to call {} tool, continuing with {} result",
                        self.dependent.name, self.primary.name
                    ),
                );
                submission.file_name.clear();
                true
            }
        };

        // STAGE 5
        if let Err(err) = self.store.append(submission.clone()) {
            error!(request_id = id, error = %err, "Failed to save submission");
            progress.failed(stages::COMPLETED, "Failed to save result!");
            return Err(err.into());
        }
        let message = if degraded {
            "Process completed without file storage"
        } else {
            "Process completed successfully!"
        };
        progress.finished(stages::COMPLETED, message);

        info!(request_id = id, degraded, "Submission finalized");
        Ok(PipelineOutcome {
            submission,
            degraded,
        })
    }

    async fn connect_clients(
        &self,
    ) -> Result<(Arc<dyn ToolClient>, Arc<dyn ToolClient>), PipelineError> {
        let primary = self.connect(&self.primary).await?;
        let dependent = self.connect(&self.dependent).await?;
        Ok((primary, dependent))
    }

    async fn connect(&self, service: &ToolService) -> Result<Arc<dyn ToolClient>, PipelineError> {
        self.clients
            .connect(service, &self.account)
            .await
            .map_err(|source| PipelineError::ClientSetup {
                service: service.name.clone(),
                source,
            })
    }

    /// Call one service's tool and extract its artifact
    async fn invoke(
        &self,
        client: &dyn ToolClient,
        service: &ToolService,
        input: &str,
    ) -> Result<Artifact, ToolError> {
        let call = client.call_tool(&service.tool_name, service.arguments(input));
        let result = match self.call_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| ToolError::Timeout(limit))??,
            None => call.await?,
        };

        if result.is_error {
            return Err(ToolError::ToolFailed(
                result
                    .first_text()
                    .unwrap_or("tool returned an error")
                    .to_string(),
            ));
        }
        service.extract(&result)
    }
}

/// Dependent-step fields replace the primary ones they refine
fn merge_enrichment(submission: &mut Submission, enriched: Artifact) {
    submission.image_url = enriched.url;
    submission.file_name = enriched.file_name.unwrap_or_default();
}
