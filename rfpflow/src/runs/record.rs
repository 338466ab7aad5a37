//! Run identifiers and records.

use crate::catalog::PipelineState;
use crate::utils::{format_iso8601, generate_uuid, now_utc, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of a submitted run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    /// Generates a fresh random id.
    #[must_use]
    pub fn new() -> Self {
        Self(generate_uuid())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for RunId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The run is executing.
    Processing,
    /// The run reached the end of the graph.
    Complete,
    /// A stage failed or the run panicked.
    Failed,
}

impl RunStatus {
    /// Returns true for Complete and Failed.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Processing)
    }

    /// Returns the wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a finished run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The final state of a completed run.
    Completed {
        /// The state returned by the last stage.
        state: Box<PipelineState>,
    },
    /// The error that stopped the run.
    Failed {
        /// The error message.
        error: String,
    },
}

impl RunOutcome {
    /// Wraps a final state.
    #[must_use]
    pub fn completed(state: PipelineState) -> Self {
        Self::Completed {
            state: Box::new(state),
        }
    }

    /// Wraps an error message.
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self::Failed {
            error: error.into(),
        }
    }

    /// Returns the status this outcome settles a run into.
    #[must_use]
    pub fn status(&self) -> RunStatus {
        match self {
            Self::Completed { .. } => RunStatus::Complete,
            Self::Failed { .. } => RunStatus::Failed,
        }
    }
}

/// A run as seen by pollers.
///
/// Created as Processing at submission and replaced exactly once by its
/// terminal form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// The run id.
    pub id: RunId,
    /// Current status.
    pub status: RunStatus,
    /// Final state or error; `None` while processing.
    pub outcome: Option<RunOutcome>,
    /// When the run was submitted.
    pub created_at: Timestamp,
    /// When the run settled.
    pub finished_at: Option<Timestamp>,
}

impl RunRecord {
    /// Creates a processing record.
    #[must_use]
    pub fn processing(id: RunId) -> Self {
        Self {
            id,
            status: RunStatus::Processing,
            outcome: None,
            created_at: now_utc(),
            finished_at: None,
        }
    }

    /// Returns the terminal form of this record.
    #[must_use]
    pub fn finished(&self, outcome: RunOutcome) -> Self {
        Self {
            id: self.id,
            status: outcome.status(),
            outcome: Some(outcome),
            created_at: self.created_at,
            finished_at: Some(now_utc()),
        }
    }

    /// Returns true once the run has settled.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Returns the final state of a completed run.
    #[must_use]
    pub fn state(&self) -> Option<&PipelineState> {
        match &self.outcome {
            Some(RunOutcome::Completed { state }) => Some(state),
            _ => None,
        }
    }

    /// Returns the error of a failed run.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            Some(RunOutcome::Failed { error }) => Some(error),
            _ => None,
        }
    }

    /// Renders the flat JSON body returned to result pollers.
    ///
    /// The body always carries `status`. A completed run adds the proposal
    /// fields, a failed run adds `error`.
    #[must_use]
    pub fn to_response(&self) -> Value {
        let mut body = json!({
            "status": self.status.as_str(),
            "pipeline_id": self.id.to_string(),
            "submitted_at": format_iso8601(&self.created_at),
        });
        if let Some(finished_at) = &self.finished_at {
            body["finished_at"] = json!(format_iso8601(finished_at));
        }
        match &self.outcome {
            Some(RunOutcome::Completed { state }) => {
                body["proposal"] = json!(state.draft);
                body["retrieved_docs"] = json!(state.references);
                body["summarized_tables"] = json!(state.table_summaries);
                body["metadata"] = json!(state.metadata);
                body["compliance_report"] =
                    json!(state.compliance.as_ref().map(|report| report.details.as_str()));
                body["compliance_passed"] = json!(state.compliance_passed());
                body["score_report"] = json!(state.score_report);
                body["optimize_attempts"] = json!(state.optimize_attempts);
                body["llm_usage_count"] = json!(state.collaborator_calls);
            }
            Some(RunOutcome::Failed { error }) => {
                body["error"] = json!(error);
            }
            None => {}
        }
        body
    }

    /// The body returned for an id the registry does not know.
    #[must_use]
    pub fn not_found_response() -> Value {
        json!({ "status": "not_found" })
    }
}
