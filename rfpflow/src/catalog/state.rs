//! Typed state threaded through every stage of a run.

use super::{StageName, StateField};
use crate::collaborators::{ComplianceReport, RequestMetadata, RequestSource, Table};
use crate::errors::FlowError;
use serde::{Deserialize, Serialize};

/// Everything a run has produced so far.
///
/// Stages take the state by value and hand back a new one, so a stage that
/// fails never leaves a half-written state behind. Fields are `None` until the
/// stage that produces them has completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    /// The submitted payload.
    pub source: RequestSource,
    /// Body text plus OCR text of the request.
    pub request_text: Option<String>,
    /// Text recovered by OCR.
    pub ocr_text: Option<String>,
    /// Tables found in the document.
    pub raw_tables: Option<Vec<Table>>,
    /// Structured request metadata.
    pub metadata: Option<RequestMetadata>,
    /// Retrieved reference proposals.
    pub references: Option<Vec<String>>,
    /// One summary per table.
    pub table_summaries: Option<Vec<String>>,
    /// The current proposal draft.
    pub draft: Option<String>,
    /// The latest compliance report.
    pub compliance: Option<ComplianceReport>,
    /// The quality score report.
    pub score_report: Option<String>,
    /// Number of tone optimization passes so far.
    pub optimize_attempts: u32,
    /// Whether the draft has been handed to the artifact index.
    pub proposal_indexed: bool,
    /// Content-generation calls made during this run.
    pub collaborator_calls: u64,
    /// Stages executed so far, in order.
    pub stage_trace: Vec<StageName>,
}

/// Where a run's compliance check ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceOutcome {
    /// No compliance check has run.
    NotChecked,
    /// The latest report passed.
    Passed,
    /// The latest report failed.
    Failed,
}

impl PipelineState {
    /// Creates a fresh state for a payload.
    #[must_use]
    pub fn new(source: RequestSource) -> Self {
        Self {
            source,
            request_text: None,
            ocr_text: None,
            raw_tables: None,
            metadata: None,
            references: None,
            table_summaries: None,
            draft: None,
            compliance: None,
            score_report: None,
            optimize_attempts: 0,
            proposal_indexed: false,
            collaborator_calls: 0,
            stage_trace: Vec::new(),
        }
    }

    /// Returns the request text, or a missing field error for `stage`.
    pub fn require_request_text(&self, stage: StageName) -> Result<&str, FlowError> {
        require(self.request_text.as_deref(), stage, StateField::RequestText)
    }

    /// Returns the raw tables, or a missing field error for `stage`.
    pub fn require_raw_tables(&self, stage: StageName) -> Result<&[Table], FlowError> {
        require(self.raw_tables.as_deref(), stage, StateField::RawTables)
    }

    /// Returns the references, or a missing field error for `stage`.
    pub fn require_references(&self, stage: StageName) -> Result<&[String], FlowError> {
        require(self.references.as_deref(), stage, StateField::References)
    }

    /// Returns the table summaries, or a missing field error for `stage`.
    pub fn require_table_summaries(&self, stage: StageName) -> Result<&[String], FlowError> {
        require(self.table_summaries.as_deref(), stage, StateField::TableSummaries)
    }

    /// Returns the metadata, or a missing field error for `stage`.
    pub fn require_metadata(&self, stage: StageName) -> Result<&RequestMetadata, FlowError> {
        require(self.metadata.as_ref(), stage, StateField::Metadata)
    }

    /// Returns the draft, or a missing field error for `stage`.
    pub fn require_draft(&self, stage: StageName) -> Result<&str, FlowError> {
        require(self.draft.as_deref(), stage, StateField::Draft)
    }

    /// Returns the outcome of the most recent compliance check.
    #[must_use]
    pub fn compliance_outcome(&self) -> ComplianceOutcome {
        match &self.compliance {
            None => ComplianceOutcome::NotChecked,
            Some(report) if report.passed => ComplianceOutcome::Passed,
            Some(_) => ComplianceOutcome::Failed,
        }
    }

    /// Returns true if the compliance check passed.
    #[must_use]
    pub fn compliance_passed(&self) -> bool {
        self.compliance_outcome() == ComplianceOutcome::Passed
    }

    /// Returns true if the run finished with a failing compliance report.
    ///
    /// This is the observable trace of the bounded retry giving up: scoring
    /// only runs on a failing report once the optimization attempts are
    /// exhausted.
    #[must_use]
    pub fn needs_review(&self) -> bool {
        self.score_report.is_some() && self.compliance_outcome() == ComplianceOutcome::Failed
    }

    /// Returns true if no tone optimization passes remain under `max`.
    #[must_use]
    pub fn attempts_exhausted(&self, max: u32) -> bool {
        self.optimize_attempts >= max
    }

    /// Returns how many times `stage` has executed.
    #[must_use]
    pub fn executions_of(&self, stage: StageName) -> usize {
        self.stage_trace.iter().filter(|s| **s == stage).count()
    }
}

fn require<T: ?Sized>(
    value: Option<&T>,
    stage: StageName,
    field: StateField,
) -> Result<&T, FlowError> {
    value.ok_or_else(|| FlowError::missing_field(stage, field))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_state() -> PipelineState {
        PipelineState::new(RequestSource::Text("Build a bridge".to_string()))
    }

    #[test]
    fn test_new_state_has_only_initial_fields() {
        let state = text_state();

        assert!(state.request_text.is_none());
        assert!(state.draft.is_none());
        assert_eq!(state.optimize_attempts, 0);
        assert!(!state.proposal_indexed);
        assert!(state.stage_trace.is_empty());
    }

    #[test]
    fn test_require_missing_field() {
        let state = text_state();
        let err = state.require_draft(StageName::CheckCompliance).unwrap_err();

        assert!(matches!(
            err,
            FlowError::MissingField {
                stage: StageName::CheckCompliance,
                field: StateField::Draft,
            }
        ));
    }

    #[test]
    fn test_require_present_field() {
        let mut state = text_state();
        state.draft = Some("Dear client".to_string());

        assert_eq!(state.require_draft(StageName::ScoreProposal).unwrap(), "Dear client");
    }

    #[test]
    fn test_compliance_outcome() {
        let mut state = text_state();
        assert_eq!(state.compliance_outcome(), ComplianceOutcome::NotChecked);

        state.compliance = Some(ComplianceReport::failed("missing pricing"));
        assert_eq!(state.compliance_outcome(), ComplianceOutcome::Failed);
        assert!(!state.needs_review());

        state.score_report = Some("7/10".to_string());
        assert!(state.needs_review());

        state.compliance = Some(ComplianceReport::passed("all clear"));
        assert!(state.compliance_passed());
        assert!(!state.needs_review());
    }

    #[test]
    fn test_attempts_exhausted() {
        let mut state = text_state();
        assert!(!state.attempts_exhausted(2));

        state.optimize_attempts = 2;
        assert!(state.attempts_exhausted(2));
        assert!(!state.attempts_exhausted(3));
    }

    #[test]
    fn test_executions_of() {
        let mut state = text_state();
        state.stage_trace = vec![
            StageName::OptimizeTone,
            StageName::CheckCompliance,
            StageName::OptimizeTone,
        ];

        assert_eq!(state.executions_of(StageName::OptimizeTone), 2);
        assert_eq!(state.executions_of(StageName::ScoreProposal), 0);
    }

    #[test]
    fn test_state_serializes() {
        let state = text_state();
        let json = serde_json::to_value(&state).unwrap();

        assert_eq!(json["optimize_attempts"], 0);
        assert_eq!(json["source"]["text"], "Build a bridge");
    }
}
