//! Caller-facing facade over the run registry and the status board.

use crate::collaborators::{Collaborators, RequestSource};
use crate::config::FlowConfig;
use crate::errors::FlowError;
use crate::graph::{proposal_graph, WorkflowGraph};
use crate::runs::{Refinement, RunId, RunRecord, RunRegistry, WaitOutcome};
use crate::stages::StageContext;
use crate::status::{PipelineDuration, StatusSnapshot};
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::info;

/// Submit, poll, refine, and observe proposal runs.
///
/// One service owns one status board and one pair of timing markers; every
/// run it starts reports to them.
#[derive(Debug, Clone)]
pub struct ProposalService {
    registry: RunRegistry,
    refinements: Arc<DashMap<RunId, Refinement>>,
}

impl ProposalService {
    /// Creates a service running the standard proposal graph.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(collaborators: Collaborators, config: FlowConfig) -> Result<Self, FlowError> {
        Self::from_context(StageContext::new(collaborators, config))
    }

    /// Creates a service running the standard proposal graph with a prepared
    /// context, e.g. one carrying an event sink.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn from_context(context: StageContext) -> Result<Self, FlowError> {
        context.config().validate()?;
        let graph = proposal_graph(context.config().max_optimize_attempts)?;
        Ok(Self::with_graph(graph, context))
    }

    /// Creates a service running a custom graph.
    #[must_use]
    pub fn with_graph(graph: WorkflowGraph, context: StageContext) -> Self {
        Self {
            registry: RunRegistry::new(Arc::new(graph), context),
            refinements: Arc::new(DashMap::new()),
        }
    }

    /// Returns the run registry.
    #[must_use]
    pub fn registry(&self) -> &RunRegistry {
        &self.registry
    }

    /// Resets the status board, stamps the pipeline start, and submits a run.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Internal`] outside a tokio runtime and
    /// [`FlowError::InvalidRequest`] for blank request text. Nothing is reset
    /// or registered in either case.
    pub fn submit(&self, source: RequestSource) -> Result<RunId, FlowError> {
        if Handle::try_current().is_err() {
            return Err(FlowError::Internal(
                "runs can only be submitted from within a tokio runtime".to_string(),
            ));
        }
        if let RequestSource::Text(text) = &source {
            if text.trim().is_empty() {
                return Err(FlowError::InvalidRequest(
                    "request text cannot be empty".to_string(),
                ));
            }
        }

        let ctx = self.registry.context();
        ctx.status().reset();
        ctx.markers().mark_start();
        Ok(self.registry.submit(source))
    }

    /// Returns a snapshot of a run, or `None` if the id is unknown.
    #[must_use]
    pub fn poll(&self, id: RunId) -> Option<RunRecord> {
        self.registry.poll(id)
    }

    /// Returns the JSON body for a result poll, `{"status": "not_found"}`
    /// for unknown ids. A refined run also carries its latest revision.
    #[must_use]
    pub fn poll_response(&self, id: RunId) -> Value {
        let Some(record) = self.poll(id) else {
            return RunRecord::not_found_response();
        };
        let mut body = record.to_response();
        if let Some(refinement) = self.refinements.get(&id) {
            refinement.annotate(&mut body);
        }
        body
    }

    /// Waits for a run using the configured polling interval.
    pub async fn wait_for(&self, id: RunId, timeout: Duration) -> WaitOutcome {
        let interval = self.registry.context().config().poll_interval();
        self.registry.wait_for(id, timeout, interval).await
    }

    /// Returns the newest proposal of a completed run: its latest revision if
    /// it was refined, the generated draft otherwise.
    #[must_use]
    pub fn latest_proposal(&self, id: RunId) -> Option<String> {
        let record = self.registry.poll(id)?;
        let draft = record
            .state()?
            .draft
            .clone()
            .filter(|draft| !draft.trim().is_empty())?;
        Some(
            self.refinements
                .get(&id)
                .map_or(draft, |refinement| refinement.proposal.clone()),
        )
    }

    /// Returns the latest revision of a run, if it was refined.
    #[must_use]
    pub fn refinement(&self, id: RunId) -> Option<Refinement> {
        self.refinements.get(&id).map(|refinement| refinement.clone())
    }

    /// Revises the newest proposal of a completed run using `feedback`.
    ///
    /// Each call builds on the previous revision. The run record itself is
    /// never rewritten.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::InvalidRequest`] for blank feedback,
    /// [`FlowError::NoProposal`] if the run is unknown or has not completed,
    /// and the generator's error if the revision fails.
    pub async fn refine(&self, id: RunId, feedback: &str) -> Result<String, FlowError> {
        let feedback = feedback.trim();
        if feedback.is_empty() {
            return Err(FlowError::InvalidRequest(
                "feedback cannot be empty".to_string(),
            ));
        }
        let current = self.latest_proposal(id).ok_or(FlowError::NoProposal(id))?;

        let refined = self
            .registry
            .context()
            .collaborators()
            .generator
            .refine_proposal(&current, feedback)
            .await?;

        // The run may have been cleared while the generator was working.
        if self.registry.poll(id).is_none() {
            return Err(FlowError::NoProposal(id));
        }
        self.refinements
            .entry(id)
            .and_modify(|refinement| refinement.advance(refined.clone()))
            .or_insert_with(|| Refinement::first(id, refined.clone()));

        info!(run_id = %id, chars = refined.len(), "Proposal refined");
        Ok(refined)
    }

    /// Returns every label's current entry.
    #[must_use]
    pub fn status_snapshot(&self) -> StatusSnapshot {
        self.registry.context().status().snapshot()
    }

    /// Returns the audit log text.
    #[must_use]
    pub fn audit_log(&self) -> String {
        self.registry.context().status().log_text()
    }

    /// Returns how long the most recent pipeline took.
    #[must_use]
    pub fn duration(&self) -> PipelineDuration {
        self.registry.context().markers().duration()
    }

    /// Resets the status board, clears the timing markers, and forgets every
    /// run and revision.
    pub fn full_reset(&self) {
        let ctx = self.registry.context();
        ctx.status().reset();
        ctx.markers().clear();
        self.registry.clear();
        self.refinements.clear();
        info!("Service reset");
    }
}
