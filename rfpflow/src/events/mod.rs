//! Lifecycle events for observability.
//!
//! The executor and the run registry report what they do as [`FlowEvent`]s.
//! Where the events go is up to the [`EventSink`] the caller installs.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

use crate::catalog::StageName;
use crate::runs::{RunId, RunStatus};
use serde::{Deserialize, Serialize};

/// Where the walk goes after a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteTarget {
    /// Another stage.
    Stage(StageName),
    /// The end of the graph.
    End,
}

/// Something that happened during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlowEvent {
    /// A run was accepted by the registry.
    RunSubmitted {
        /// The run.
        run_id: RunId,
    },
    /// A stage was invoked.
    StageStarted {
        /// The run, when the walk belongs to a registered run.
        run_id: Option<RunId>,
        /// The stage.
        stage: StageName,
    },
    /// A stage returned a new state.
    StageCompleted {
        /// The run, when the walk belongs to a registered run.
        run_id: Option<RunId>,
        /// The stage.
        stage: StageName,
        /// How long the stage took.
        duration_ms: f64,
    },
    /// A stage failed and the walk stopped.
    StageFailed {
        /// The run, when the walk belongs to a registered run.
        run_id: Option<RunId>,
        /// The stage.
        stage: StageName,
        /// The error message.
        error: String,
    },
    /// An edge was followed.
    RouteTaken {
        /// The run, when the walk belongs to a registered run.
        run_id: Option<RunId>,
        /// The stage the edge leaves.
        from: StageName,
        /// Where the edge leads.
        to: RouteTarget,
        /// Whether a decision function chose the target.
        conditional: bool,
    },
    /// A run reached a terminal status.
    RunFinished {
        /// The run.
        run_id: RunId,
        /// Complete or Failed.
        status: RunStatus,
    },
}

impl FlowEvent {
    /// Returns the dotted event type, e.g. `stage.started`.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RunSubmitted { .. } => "run.submitted",
            Self::StageStarted { .. } => "stage.started",
            Self::StageCompleted { .. } => "stage.completed",
            Self::StageFailed { .. } => "stage.failed",
            Self::RouteTaken { .. } => "route.taken",
            Self::RunFinished { .. } => "run.finished",
        }
    }
}
