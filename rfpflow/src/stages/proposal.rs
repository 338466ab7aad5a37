//! The eight stages of the proposal workflow.

use super::{Stage, StageContext};
use crate::catalog::{PipelineState, StageName};
use crate::collaborators::{Artifact, ExtractedDocument, RequestSource};
use crate::errors::FlowError;
use crate::status::{AgentLabel, AgentState};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Characters of request text handed to metadata extraction.
pub const METADATA_CHUNK_CHARS: usize = 5000;

const NO_TABLES: &str = "no tables";

/// Returns every proposal stage, in catalog order.
#[must_use]
pub fn proposal_stages() -> Vec<Arc<dyn Stage>> {
    vec![
        Arc::new(ExtractDocumentStage),
        Arc::new(EnrichRequestStage),
        Arc::new(RetrieveReferencesStage),
        Arc::new(SummarizeTablesStage),
        Arc::new(GenerateDraftStage),
        Arc::new(OptimizeToneStage),
        Arc::new(CheckComplianceStage),
        Arc::new(ScoreProposalStage),
    ]
}

/// Reads the submitted document into request text, OCR text, and tables.
///
/// A raw-text payload skips the extractor and becomes the request text as is.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractDocumentStage;

#[async_trait]
impl Stage for ExtractDocumentStage {
    fn name(&self) -> StageName {
        StageName::ExtractDocument
    }

    async fn run(
        &self,
        mut state: PipelineState,
        ctx: &StageContext,
    ) -> Result<PipelineState, FlowError> {
        let (request_text, document) = match &state.source {
            RequestSource::Path(path) => {
                ctx.report(
                    AgentLabel::RfpAnalyzer,
                    AgentState::working("Extracting document contents"),
                    true,
                );
                let document = ctx.collaborators().extractor.extract(path).await?;
                (document.combined_text(), document)
            }
            RequestSource::Text(text) => (text.clone(), ExtractedDocument::default()),
        };

        if document.tables.is_empty() {
            ctx.report(AgentLabel::TableSummarizer, AgentState::skipped(NO_TABLES), true);
        }
        debug!(
            chars = request_text.len(),
            tables = document.tables.len(),
            "Request extracted"
        );

        state.request_text = Some(request_text);
        state.ocr_text = Some(document.ocr_text);
        state.raw_tables = Some(document.tables);
        Ok(state)
    }
}

/// Trims the request text and extracts structured metadata from it.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnrichRequestStage;

#[async_trait]
impl Stage for EnrichRequestStage {
    fn name(&self) -> StageName {
        StageName::EnrichRequest
    }

    async fn run(
        &self,
        mut state: PipelineState,
        ctx: &StageContext,
    ) -> Result<PipelineState, FlowError> {
        let text = state.require_request_text(self.name())?.trim().to_string();
        let chunk = leading_chars(&text, METADATA_CHUNK_CHARS);

        let metadata = ctx
            .collaborators()
            .generator
            .extract_metadata(chunk)
            .await
            .normalized();
        state.collaborator_calls += 1;

        debug!(
            industry = %metadata.industry,
            region = %metadata.region,
            constraints = metadata.constraints.len(),
            "Request enriched"
        );
        state.request_text = Some(text);
        state.metadata = Some(metadata);
        Ok(state)
    }
}

/// Retrieves similar past proposals.
///
/// A retrieval failure degrades to an empty reference list.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetrieveReferencesStage;

#[async_trait]
impl Stage for RetrieveReferencesStage {
    fn name(&self) -> StageName {
        StageName::RetrieveReferences
    }

    async fn run(
        &self,
        mut state: PipelineState,
        ctx: &StageContext,
    ) -> Result<PipelineState, FlowError> {
        let text = state.require_request_text(self.name())?;
        let k = ctx.config().retrieval_top_k;

        let references = match ctx.collaborators().retriever.retrieve(text, k).await {
            Ok(mut references) => {
                references.truncate(k);
                references
            }
            Err(e) => {
                warn!(error = %e, "Reference retrieval failed, continuing without references");
                Vec::new()
            }
        };

        state.references = Some(references);
        Ok(state)
    }
}

/// Summarizes each extracted table.
#[derive(Debug, Clone, Copy, Default)]
pub struct SummarizeTablesStage;

#[async_trait]
impl Stage for SummarizeTablesStage {
    fn name(&self) -> StageName {
        StageName::SummarizeTables
    }

    fn completion_state(&self, state: &PipelineState) -> AgentState {
        match state.raw_tables.as_deref() {
            Some([]) => AgentState::skipped(NO_TABLES),
            _ => AgentState::Done,
        }
    }

    async fn run(
        &self,
        mut state: PipelineState,
        ctx: &StageContext,
    ) -> Result<PipelineState, FlowError> {
        let tables = state.require_raw_tables(self.name())?.to_vec();
        let total = tables.len();
        let mut summaries = Vec::with_capacity(total);

        for (i, table) in tables.iter().enumerate() {
            ctx.report(
                self.label(),
                AgentState::working(format!("Summarizing table {}/{}", i + 1, total)),
                false,
            );
            let markdown = table.to_markdown();
            let summary = ctx
                .collaborators()
                .generator
                .summarize_table(&markdown)
                .await?;
            state.collaborator_calls += 1;
            summaries.push(format!("Table\n{markdown}\n\nSummary: {summary}"));
        }

        state.table_summaries = Some(summaries);
        Ok(state)
    }
}

/// Writes the first proposal draft.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenerateDraftStage;

#[async_trait]
impl Stage for GenerateDraftStage {
    fn name(&self) -> StageName {
        StageName::GenerateDraft
    }

    async fn run(
        &self,
        mut state: PipelineState,
        ctx: &StageContext,
    ) -> Result<PipelineState, FlowError> {
        let name = self.name();
        let draft = ctx
            .collaborators()
            .generator
            .generate_draft(
                state.require_request_text(name)?,
                state.require_references(name)?,
                state.require_table_summaries(name)?,
            )
            .await?;
        state.collaborator_calls += 1;

        state.draft = Some(draft);
        Ok(state)
    }
}

/// Rewrites the draft for the client's industry and bumps the attempt
/// counter.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptimizeToneStage;

#[async_trait]
impl Stage for OptimizeToneStage {
    fn name(&self) -> StageName {
        StageName::OptimizeTone
    }

    async fn run(
        &self,
        mut state: PipelineState,
        ctx: &StageContext,
    ) -> Result<PipelineState, FlowError> {
        let name = self.name();
        let optimized = ctx
            .collaborators()
            .generator
            .optimize_tone(
                state.require_draft(name)?,
                &state.require_metadata(name)?.industry,
                &ctx.config().tone,
            )
            .await?;
        state.collaborator_calls += 1;

        state.draft = Some(optimized);
        state.optimize_attempts += 1;
        debug!(attempt = state.optimize_attempts, "Draft tone optimized");
        Ok(state)
    }
}

/// Audits the current draft against the request.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckComplianceStage;

#[async_trait]
impl Stage for CheckComplianceStage {
    fn name(&self) -> StageName {
        StageName::CheckCompliance
    }

    async fn run(
        &self,
        mut state: PipelineState,
        ctx: &StageContext,
    ) -> Result<PipelineState, FlowError> {
        let name = self.name();
        let report = ctx
            .collaborators()
            .generator
            .check_compliance(state.require_request_text(name)?, state.require_draft(name)?)
            .await?;
        state.collaborator_calls += 1;

        debug!(
            passed = report.passed,
            attempts = state.optimize_attempts,
            "Compliance checked"
        );
        state.compliance = Some(report);
        Ok(state)
    }
}

/// Scores the draft, indexes it once per run, and stamps the pipeline end.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreProposalStage;

#[async_trait]
impl Stage for ScoreProposalStage {
    fn name(&self) -> StageName {
        StageName::ScoreProposal
    }

    async fn run(
        &self,
        mut state: PipelineState,
        ctx: &StageContext,
    ) -> Result<PipelineState, FlowError> {
        let draft = state.require_draft(self.name())?.to_string();
        let score = ctx.collaborators().generator.score_quality(&draft).await?;
        state.collaborator_calls += 1;

        if state.proposal_indexed {
            debug!("Proposal already indexed for this run");
        } else {
            state.proposal_indexed = true;
            let artifact = Artifact::from_draft(draft);
            let artifact_id = artifact.id.clone();
            match ctx.collaborators().index.index(artifact).await {
                Ok(()) => debug!(artifact_id = %artifact_id, "Proposal indexed"),
                Err(e) => warn!(artifact_id = %artifact_id, error = %e, "Failed to index proposal"),
            }
        }

        ctx.markers().mark_end();
        state.score_report = Some(score);
        Ok(state)
    }
}

fn leading_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
