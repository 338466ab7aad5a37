//! The fixed catalog of proposal stages.
//!
//! This module names every stage of the proposal workflow, the dashboard
//! label each one reports under, and the state fields each one reads and
//! writes. It says nothing about how a stage runs; the `stages` module
//! provides the implementations and the `graph` module wires them together.

mod names;
mod state;

pub use names::{StageDescriptor, StageName, StateField};
pub use state::{ComplianceOutcome, PipelineState};

use crate::status::AgentLabel;

const CATALOG: [StageDescriptor; 8] = [
    StageDescriptor {
        name: StageName::ExtractDocument,
        label: AgentLabel::RfpAnalyzer,
        reads: &[StateField::Source],
        writes: &[StateField::RequestText, StateField::OcrText, StateField::RawTables],
    },
    StageDescriptor {
        name: StageName::EnrichRequest,
        label: AgentLabel::RfpAnalyzer,
        reads: &[StateField::RequestText],
        writes: &[StateField::RequestText, StateField::Metadata],
    },
    StageDescriptor {
        name: StageName::RetrieveReferences,
        label: AgentLabel::ContextRetriever,
        reads: &[StateField::RequestText],
        writes: &[StateField::References],
    },
    StageDescriptor {
        name: StageName::SummarizeTables,
        label: AgentLabel::TableSummarizer,
        reads: &[StateField::RawTables],
        writes: &[StateField::TableSummaries],
    },
    StageDescriptor {
        name: StageName::GenerateDraft,
        label: AgentLabel::ProposalGenerator,
        reads: &[
            StateField::RequestText,
            StateField::References,
            StateField::TableSummaries,
        ],
        writes: &[StateField::Draft],
    },
    StageDescriptor {
        name: StageName::OptimizeTone,
        label: AgentLabel::StrategyOptimizer,
        reads: &[StateField::Draft, StateField::Metadata, StateField::OptimizeAttempts],
        writes: &[StateField::Draft, StateField::OptimizeAttempts],
    },
    StageDescriptor {
        name: StageName::CheckCompliance,
        label: AgentLabel::ComplianceChecker,
        reads: &[StateField::RequestText, StateField::Draft],
        writes: &[StateField::Compliance],
    },
    StageDescriptor {
        name: StageName::ScoreProposal,
        label: AgentLabel::Scorer,
        reads: &[StateField::Draft, StateField::ProposalIndexed],
        writes: &[StateField::ScoreReport, StateField::ProposalIndexed],
    },
];

/// Lookup over the fixed stage catalog.
#[derive(Debug, Clone, Copy, Default)]
pub struct StageCatalog;

impl StageCatalog {
    /// Returns the descriptor for a stage.
    #[must_use]
    pub fn descriptor(name: StageName) -> &'static StageDescriptor {
        // CATALOG is declared in StageName::ALL order.
        &CATALOG[name.index()]
    }

    /// Returns every descriptor in declaration order.
    #[must_use]
    pub fn all() -> &'static [StageDescriptor] {
        &CATALOG
    }

    /// Returns the dashboard label a stage reports under.
    #[must_use]
    pub fn label(name: StageName) -> AgentLabel {
        Self::descriptor(name).label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_order_matches_stage_names() {
        for (descriptor, name) in StageCatalog::all().iter().zip(StageName::ALL) {
            assert_eq!(descriptor.name, name);
        }
        assert_eq!(StageCatalog::all().len(), StageName::ALL.len());
    }

    #[test]
    fn test_analyzer_label_is_shared() {
        assert_eq!(StageCatalog::label(StageName::ExtractDocument), AgentLabel::RfpAnalyzer);
        assert_eq!(StageCatalog::label(StageName::EnrichRequest), AgentLabel::RfpAnalyzer);
        assert_eq!(StageCatalog::label(StageName::ScoreProposal), AgentLabel::Scorer);
    }

    #[test]
    fn test_only_optimizer_writes_attempt_counter() {
        let writers: Vec<_> = StageCatalog::all()
            .iter()
            .filter(|d| d.writes.contains(&StateField::OptimizeAttempts))
            .map(|d| d.name)
            .collect();

        assert_eq!(writers, vec![StageName::OptimizeTone]);
    }

    #[test]
    fn test_linear_order_never_reads_forward() {
        let mut available: Vec<StateField> = StateField::INITIAL.to_vec();
        for descriptor in StageCatalog::all() {
            for field in descriptor.reads {
                assert!(
                    available.contains(field),
                    "{} reads {} before it is produced",
                    descriptor.name,
                    field
                );
            }
            available.extend_from_slice(descriptor.writes);
        }
    }
}
