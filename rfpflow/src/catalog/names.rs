//! Stage and state field identifiers.

use crate::status::AgentLabel;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A node in the proposal workflow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    /// Reads the source document into text, OCR text, and tables.
    ExtractDocument,
    /// Extracts structured metadata from the request text.
    EnrichRequest,
    /// Fetches similar past proposals.
    RetrieveReferences,
    /// Summarizes each extracted table.
    SummarizeTables,
    /// Writes the first proposal draft.
    GenerateDraft,
    /// Rewrites the draft for the client's industry and tone.
    OptimizeTone,
    /// Audits the draft against the request.
    CheckCompliance,
    /// Scores the final draft and indexes it.
    ScoreProposal,
}

impl StageName {
    /// Every stage, in catalog order.
    pub const ALL: [Self; 8] = [
        Self::ExtractDocument,
        Self::EnrichRequest,
        Self::RetrieveReferences,
        Self::SummarizeTables,
        Self::GenerateDraft,
        Self::OptimizeTone,
        Self::CheckCompliance,
        Self::ScoreProposal,
    ];

    /// Returns the human-readable stage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ExtractDocument => "Extract Document",
            Self::EnrichRequest => "Enrich Request",
            Self::RetrieveReferences => "Retrieve References",
            Self::SummarizeTables => "Summarize Tables",
            Self::GenerateDraft => "Generate Draft",
            Self::OptimizeTone => "Optimize Tone",
            Self::CheckCompliance => "Check Compliance",
            Self::ScoreProposal => "Score Proposal",
        }
    }

    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named field of [`PipelineState`](super::PipelineState).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateField {
    /// The submitted payload.
    Source,
    /// Body text plus OCR text of the request.
    RequestText,
    /// Text recovered by OCR.
    OcrText,
    /// Tables found in the document.
    RawTables,
    /// Structured request metadata.
    Metadata,
    /// Retrieved reference proposals.
    References,
    /// One summary per table.
    TableSummaries,
    /// The current proposal draft.
    Draft,
    /// The latest compliance report.
    Compliance,
    /// The quality score report.
    ScoreReport,
    /// Number of tone optimization passes.
    OptimizeAttempts,
    /// Whether the draft has been indexed.
    ProposalIndexed,
}

impl StateField {
    /// Fields populated when a state is created, before any stage runs.
    pub const INITIAL: [Self; 3] = [Self::Source, Self::OptimizeAttempts, Self::ProposalIndexed];

    /// Returns the snake_case field name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::RequestText => "request_text",
            Self::OcrText => "ocr_text",
            Self::RawTables => "raw_tables",
            Self::Metadata => "metadata",
            Self::References => "references",
            Self::TableSummaries => "table_summaries",
            Self::Draft => "draft",
            Self::Compliance => "compliance",
            Self::ScoreReport => "score_report",
            Self::OptimizeAttempts => "optimize_attempts",
            Self::ProposalIndexed => "proposal_indexed",
        }
    }
}

impl fmt::Display for StateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a stage consumes and produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageDescriptor {
    /// The stage.
    pub name: StageName,
    /// The dashboard label the stage reports under.
    pub label: AgentLabel,
    /// Fields the stage reads.
    pub reads: &'static [StateField],
    /// Fields the stage writes.
    pub writes: &'static [StateField],
}
