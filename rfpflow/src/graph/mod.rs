//! Workflow graph: stages joined by edges, walked one stage at a time.
//!
//! This module provides:
//! - [`Edge`] and the compliance decision function
//! - [`GraphBuilder`] with structural and dataflow validation
//! - [`WorkflowGraph`], the executor that walks a built graph
//! - [`proposal_graph`], the standard proposal wiring

mod builder;
mod executor;


pub use builder::GraphBuilder;
pub use executor::WorkflowGraph;

use crate::catalog::{PipelineState, StageName};
use crate::errors::GraphValidationError;
use crate::events::RouteTarget;
use crate::stages::proposal_stages;
use std::fmt;
use std::sync::Arc;

/// A decision function for a conditional edge.
pub type Decision = Arc<dyn Fn(&PipelineState) -> RouteTarget + Send + Sync>;

/// The single outgoing edge of a stage.
#[derive(Clone)]
pub enum Edge {
    /// Always continue to a stage.
    To(StageName),
    /// Always finish the run.
    End,
    /// Let a decision function pick one of the declared targets.
    Conditional {
        /// Every target the decision may return.
        targets: Vec<RouteTarget>,
        /// The decision function.
        decide: Decision,
    },
}

impl Edge {
    /// Creates a conditional edge.
    pub fn conditional<I, F>(targets: I, decide: F) -> Self
    where
        I: IntoIterator<Item = RouteTarget>,
        F: Fn(&PipelineState) -> RouteTarget + Send + Sync + 'static,
    {
        Self::Conditional {
            targets: targets.into_iter().collect(),
            decide: Arc::new(decide),
        }
    }

    /// Returns every target this edge can lead to.
    #[must_use]
    pub fn targets(&self) -> Vec<RouteTarget> {
        match self {
            Self::To(name) => vec![RouteTarget::Stage(*name)],
            Self::End => vec![RouteTarget::End],
            Self::Conditional { targets, .. } => targets.clone(),
        }
    }

    /// Returns true for conditional edges.
    #[must_use]
    pub fn is_conditional(&self) -> bool {
        matches!(self, Self::Conditional { .. })
    }

    /// Picks the next target for `state`.
    #[must_use]
    pub fn next(&self, state: &PipelineState) -> RouteTarget {
        match self {
            Self::To(name) => RouteTarget::Stage(*name),
            Self::End => RouteTarget::End,
            Self::Conditional { decide, .. } => decide(state),
        }
    }
}

impl fmt::Debug for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::To(name) => f.debug_tuple("To").field(name).finish(),
            Self::End => f.write_str("End"),
            Self::Conditional { targets, .. } => f
                .debug_struct("Conditional")
                .field("targets", targets)
                .finish_non_exhaustive(),
        }
    }
}

/// The edge leaving the compliance check.
///
/// A passing report goes to scoring. A failing report loops back to tone
/// optimization until `max_attempts` passes have run, then goes to scoring
/// anyway.
#[must_use]
pub fn compliance_route(max_attempts: u32) -> Edge {
    Edge::conditional(
        [
            RouteTarget::Stage(StageName::OptimizeTone),
            RouteTarget::Stage(StageName::ScoreProposal),
        ],
        move |state| {
            if state.compliance_passed() || state.attempts_exhausted(max_attempts) {
                RouteTarget::Stage(StageName::ScoreProposal)
            } else {
                RouteTarget::Stage(StageName::OptimizeTone)
            }
        },
    )
}

/// Builds the standard proposal graph.
///
/// Extract, enrich, retrieve, summarize, generate, optimize, and check run in
/// that order; the check loops back to optimization through
/// [`compliance_route`]; scoring ends the run.
pub fn proposal_graph(max_attempts: u32) -> Result<WorkflowGraph, GraphValidationError> {
    let mut builder = GraphBuilder::new().entry(StageName::ExtractDocument);
    for stage in proposal_stages() {
        builder = builder.stage(stage);
    }
    builder
        .edge(StageName::ExtractDocument, Edge::To(StageName::EnrichRequest))
        .edge(StageName::EnrichRequest, Edge::To(StageName::RetrieveReferences))
        .edge(StageName::RetrieveReferences, Edge::To(StageName::SummarizeTables))
        .edge(StageName::SummarizeTables, Edge::To(StageName::GenerateDraft))
        .edge(StageName::GenerateDraft, Edge::To(StageName::OptimizeTone))
        .edge(StageName::OptimizeTone, Edge::To(StageName::CheckCompliance))
        .edge(StageName::CheckCompliance, compliance_route(max_attempts))
        .edge(StageName::ScoreProposal, Edge::End)
        .build()
}
