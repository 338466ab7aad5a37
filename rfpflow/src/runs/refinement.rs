//! Reviewer-driven revisions of finished proposals.

use super::RunId;
use crate::utils::{format_iso8601, now_utc, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// The latest revision of a completed run's proposal.
///
/// Kept beside the run record, which stays exactly as the run left it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refinement {
    /// The run whose proposal was revised.
    pub run_id: RunId,
    /// The revised proposal.
    pub proposal: String,
    /// Feedback rounds applied so far; each is one generator call.
    pub rounds: u64,
    /// When the latest revision was stored.
    pub refined_at: Timestamp,
}

impl Refinement {
    /// Creates the first revision of a run's proposal.
    #[must_use]
    pub fn first(run_id: RunId, proposal: String) -> Self {
        Self {
            run_id,
            proposal,
            rounds: 1,
            refined_at: now_utc(),
        }
    }

    /// Replaces the proposal with a newer revision.
    pub fn advance(&mut self, proposal: String) {
        self.proposal = proposal;
        self.rounds += 1;
        self.refined_at = now_utc();
    }

    /// Adds the revision to a poll response body, counting its generator
    /// calls in `llm_usage_count`.
    pub fn annotate(&self, body: &mut Value) {
        let base = body["llm_usage_count"].as_u64().unwrap_or(0);
        body["refined_proposal"] = json!(self.proposal);
        body["refinement_rounds"] = json!(self.rounds);
        body["refined_at"] = json!(format_iso8601(&self.refined_at));
        body["llm_usage_count"] = json!(base + self.rounds);
    }
}
