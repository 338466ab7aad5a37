//! Sequential walk over a validated workflow graph.

use super::Edge;
use crate::catalog::{PipelineState, StageName};
use crate::errors::FlowError;
use crate::events::{FlowEvent, RouteTarget};
use crate::stages::{Stage, StageContext};
use crate::status::AgentState;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info_span, warn, Instrument};

/// A validated workflow graph.
///
/// Built by [`super::GraphBuilder`]. Every registered stage has exactly one
/// outgoing edge and is reachable from the entry.
#[derive(Debug, Clone)]
pub struct WorkflowGraph {
    entry: StageName,
    stages: BTreeMap<StageName, Arc<dyn Stage>>,
    edges: BTreeMap<StageName, Edge>,
}

impl WorkflowGraph {
    pub(super) fn new(
        entry: StageName,
        stages: BTreeMap<StageName, Arc<dyn Stage>>,
        edges: BTreeMap<StageName, Edge>,
    ) -> Self {
        Self {
            entry,
            stages,
            edges,
        }
    }

    /// Returns the entry stage.
    #[must_use]
    pub fn entry(&self) -> StageName {
        self.entry
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Returns the registered stage names.
    pub fn stage_names(&self) -> impl Iterator<Item = StageName> + '_ {
        self.stages.keys().copied()
    }

    /// Returns the outgoing edge of a stage.
    #[must_use]
    pub fn edge(&self, name: StageName) -> Option<&Edge> {
        self.edges.get(&name)
    }

    /// Walks the graph from its entry stage.
    pub async fn run(
        &self,
        state: PipelineState,
        ctx: &StageContext,
    ) -> Result<PipelineState, FlowError> {
        self.run_from(self.entry, state, ctx).await
    }

    /// Walks the graph from `entry` until an edge leads to the end.
    ///
    /// Around each stage the label is marked in progress (not forced) before
    /// the call and settled (forced) after it. The first stage error stops
    /// the walk: the label is marked failed and the error is returned.
    pub async fn run_from(
        &self,
        entry: StageName,
        mut state: PipelineState,
        ctx: &StageContext,
    ) -> Result<PipelineState, FlowError> {
        let run_id = ctx.run_id();
        let max_steps = ctx.config().max_steps;
        let mut current = entry;
        let mut steps = 0usize;

        loop {
            let stage = self
                .stages
                .get(&current)
                .ok_or(FlowError::UnknownStage(current))?;
            let label = stage.label();

            if steps >= max_steps {
                let err = FlowError::StepLimitExceeded { limit: max_steps };
                ctx.report(label, AgentState::failed(err.to_string()), true);
                return Err(err);
            }
            steps += 1;

            ctx.report(label, AgentState::InProgress, false);
            ctx.emit(&FlowEvent::StageStarted {
                run_id,
                stage: current,
            });
            let started = Instant::now();

            let span = info_span!("stage", stage = %current);
            state = match stage.run(state, ctx).instrument(span).await {
                Ok(next) => next,
                Err(e) => {
                    let reason = e.to_string();
                    warn!(stage = %current, error = %reason, "Stage failed");
                    ctx.report(label, AgentState::failed(reason.clone()), true);
                    ctx.emit(&FlowEvent::StageFailed {
                        run_id,
                        stage: current,
                        error: reason,
                    });
                    return Err(e);
                }
            };

            ctx.report(label, stage.completion_state(&state), true);
            state.stage_trace.push(current);
            ctx.emit(&FlowEvent::StageCompleted {
                run_id,
                stage: current,
                duration_ms: started.elapsed().as_secs_f64() * 1000.0,
            });

            let edge = self.edges.get(&current).ok_or_else(|| {
                FlowError::Internal(format!("Stage '{current}' has no outgoing edge"))
            })?;
            let target = edge.next(&state);
            if edge.is_conditional() && !edge.targets().contains(&target) {
                return Err(FlowError::Internal(format!(
                    "Decision for '{current}' returned an undeclared target {target:?}"
                )));
            }

            debug!(
                from = %current,
                to = ?target,
                conditional = edge.is_conditional(),
                "Route taken"
            );
            ctx.emit(&FlowEvent::RouteTaken {
                run_id,
                from: current,
                to: target,
                conditional: edge.is_conditional(),
            });

            match target {
                RouteTarget::End => return Ok(state),
                RouteTarget::Stage(next) => current = next,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::RequestSource;
    use crate::config::FlowConfig;
    use crate::events::CollectingEventSink;
    use crate::graph::GraphBuilder;
    use crate::stages::{FnStage, PassThroughStage};
    use crate::status::AgentLabel;
    use crate::testing::ScriptedCollaborators;

    fn state() -> PipelineState {
        PipelineState::new(RequestSource::text("Build a bridge"))
    }

    #[tokio::test]
    async fn test_linear_walk_records_trace() {
        let graph = GraphBuilder::new()
            .entry(StageName::GenerateDraft)
            .stage(Arc::new(PassThroughStage::new(StageName::GenerateDraft)))
            .stage(Arc::new(PassThroughStage::new(StageName::ScoreProposal)))
            .edge(StageName::GenerateDraft, Edge::To(StageName::ScoreProposal))
            .edge(StageName::ScoreProposal, Edge::End)
            .without_dataflow_check()
            .build()
            .unwrap();
        let ctx = ScriptedCollaborators::new().context();

        let out = graph.run(state(), &ctx).await.unwrap();

        assert_eq!(
            out.stage_trace,
            vec![StageName::GenerateDraft, StageName::ScoreProposal]
        );
        assert_eq!(ctx.status().state_of(AgentLabel::Scorer), AgentState::Done);
    }

    #[tokio::test]
    async fn test_failure_marks_label_and_stops() {
        let graph = GraphBuilder::new()
            .entry(StageName::GenerateDraft)
            .stage(Arc::new(FnStage::new(StageName::GenerateDraft, |_| {
                Err(FlowError::Internal("model offline".to_string()))
            })))
            .stage(Arc::new(PassThroughStage::new(StageName::ScoreProposal)))
            .edge(StageName::GenerateDraft, Edge::To(StageName::ScoreProposal))
            .edge(StageName::ScoreProposal, Edge::End)
            .without_dataflow_check()
            .build()
            .unwrap();
        let events = Arc::new(CollectingEventSink::new());
        let ctx = ScriptedCollaborators::new()
            .context()
            .with_events(events.clone());

        let err = graph.run(state(), &ctx).await.unwrap_err();

        assert!(err.to_string().contains("model offline"));
        assert!(matches!(
            ctx.status().state_of(AgentLabel::ProposalGenerator),
            AgentState::Failed(_)
        ));
        assert_eq!(ctx.status().state_of(AgentLabel::Scorer), AgentState::Waiting);
        assert_eq!(events.events_of_type("stage.failed").len(), 1);
        assert!(events.events_of_type("route.taken").is_empty());
    }

    #[tokio::test]
    async fn test_step_limit_stops_runaway_loop() {
        let graph = GraphBuilder::new()
            .entry(StageName::OptimizeTone)
            .stage(Arc::new(PassThroughStage::new(StageName::OptimizeTone)))
            .edge(
                StageName::OptimizeTone,
                Edge::conditional(
                    [RouteTarget::Stage(StageName::OptimizeTone), RouteTarget::End],
                    |_| RouteTarget::Stage(StageName::OptimizeTone),
                ),
            )
            .without_dataflow_check()
            .build()
            .unwrap();
        let ctx = ScriptedCollaborators::new()
            .context_with(FlowConfig::default().with_max_steps(5));

        let err = graph.run(state(), &ctx).await.unwrap_err();

        assert!(matches!(err, FlowError::StepLimitExceeded { limit: 5 }));
    }

    #[tokio::test]
    async fn test_undeclared_decision_target_is_rejected() {
        let graph = GraphBuilder::new()
            .entry(StageName::GenerateDraft)
            .stage(Arc::new(PassThroughStage::new(StageName::GenerateDraft)))
            .stage(Arc::new(PassThroughStage::new(StageName::ScoreProposal)))
            .edge(
                StageName::GenerateDraft,
                Edge::conditional([RouteTarget::Stage(StageName::ScoreProposal)], |_| {
                    RouteTarget::End
                }),
            )
            .edge(StageName::ScoreProposal, Edge::End)
            .without_dataflow_check()
            .build()
            .unwrap();
        let ctx = ScriptedCollaborators::new().context();

        let err = graph.run(state(), &ctx).await.unwrap_err();

        assert!(matches!(err, FlowError::Internal(_)));
    }

    #[tokio::test]
    async fn test_run_from_other_entry() {
        let graph = GraphBuilder::new()
            .entry(StageName::GenerateDraft)
            .stage(Arc::new(PassThroughStage::new(StageName::GenerateDraft)))
            .stage(Arc::new(PassThroughStage::new(StageName::ScoreProposal)))
            .edge(StageName::GenerateDraft, Edge::To(StageName::ScoreProposal))
            .edge(StageName::ScoreProposal, Edge::End)
            .without_dataflow_check()
            .build()
            .unwrap();
        let ctx = ScriptedCollaborators::new().context();

        let out = graph
            .run_from(StageName::ScoreProposal, state(), &ctx)
            .await
            .unwrap();
        assert_eq!(out.stage_trace, vec![StageName::ScoreProposal]);

        let err = graph
            .run_from(StageName::OptimizeTone, state(), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::UnknownStage(StageName::OptimizeTone)));
    }
}
