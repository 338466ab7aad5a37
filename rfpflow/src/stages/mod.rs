//! Stage trait and implementations.
//!
//! A stage is one named step of the proposal workflow. It consumes the
//! pipeline state by value and returns the next one; the graph executor owns
//! the walk between stages and the status updates around them.

mod context;
mod proposal;

pub use context::StageContext;
pub use proposal::{
    proposal_stages, CheckComplianceStage, EnrichRequestStage, ExtractDocumentStage,
    GenerateDraftStage, OptimizeToneStage, RetrieveReferencesStage, ScoreProposalStage,
    SummarizeTablesStage, METADATA_CHUNK_CHARS,
};

use crate::catalog::{PipelineState, StageCatalog, StageName};
use crate::errors::FlowError;
use crate::status::{AgentLabel, AgentState};
use async_trait::async_trait;
use std::fmt::Debug;

/// Trait for workflow stages.
///
/// A stage that returns an error leaves no trace in the state; the executor
/// drops the consumed state and fails the run.
#[async_trait]
pub trait Stage: Send + Sync + Debug {
    /// Returns the catalog name of the stage.
    fn name(&self) -> StageName;

    /// Returns the dashboard label the stage reports under.
    fn label(&self) -> AgentLabel {
        StageCatalog::label(self.name())
    }

    /// Returns the label state written once the stage has produced `state`.
    fn completion_state(&self, _state: &PipelineState) -> AgentState {
        AgentState::Done
    }

    /// Executes the stage.
    async fn run(&self, state: PipelineState, ctx: &StageContext)
        -> Result<PipelineState, FlowError>;
}

/// A synchronous function-based stage.
pub struct FnStage<F>
where
    F: Fn(PipelineState) -> Result<PipelineState, FlowError> + Send + Sync,
{
    name: StageName,
    func: F,
}

impl<F> FnStage<F>
where
    F: Fn(PipelineState) -> Result<PipelineState, FlowError> + Send + Sync,
{
    /// Creates a stage that runs `func` under `name`.
    pub fn new(name: StageName, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> Debug for FnStage<F>
where
    F: Fn(PipelineState) -> Result<PipelineState, FlowError> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStage").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<F> Stage for FnStage<F>
where
    F: Fn(PipelineState) -> Result<PipelineState, FlowError> + Send + Sync,
{
    fn name(&self) -> StageName {
        self.name
    }

    async fn run(
        &self,
        state: PipelineState,
        _ctx: &StageContext,
    ) -> Result<PipelineState, FlowError> {
        (self.func)(state)
    }
}

/// A stage that returns its input unchanged.
#[derive(Debug, Clone, Copy)]
pub struct PassThroughStage {
    name: StageName,
}

impl PassThroughStage {
    /// Creates a pass-through stage under `name`.
    #[must_use]
    pub fn new(name: StageName) -> Self {
        Self { name }
    }
}

#[async_trait]
impl Stage for PassThroughStage {
    fn name(&self) -> StageName {
        self.name
    }

    async fn run(
        &self,
        state: PipelineState,
        _ctx: &StageContext,
    ) -> Result<PipelineState, FlowError> {
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::RequestSource;
    use crate::testing::ScriptedCollaborators;

    fn state() -> PipelineState {
        PipelineState::new(RequestSource::text("Build a bridge"))
    }

    #[tokio::test]
    async fn test_fn_stage() {
        let stage = FnStage::new(StageName::GenerateDraft, |mut state| {
            state.draft = Some("draft".to_string());
            Ok(state)
        });
        let ctx = ScriptedCollaborators::new().context();

        assert_eq!(stage.name(), StageName::GenerateDraft);
        assert_eq!(stage.label(), AgentLabel::ProposalGenerator);

        let out = stage.run(state(), &ctx).await.unwrap();
        assert_eq!(out.draft.as_deref(), Some("draft"));
    }

    #[tokio::test]
    async fn test_pass_through_stage() {
        let stage = PassThroughStage::new(StageName::SummarizeTables);
        let ctx = ScriptedCollaborators::new().context();

        let out = stage.run(state(), &ctx).await.unwrap();
        assert_eq!(out, state());
        assert_eq!(stage.completion_state(&out), AgentState::Done);
    }
}
