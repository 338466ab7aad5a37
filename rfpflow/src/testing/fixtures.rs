//! Ready-made pipeline states.

use crate::catalog::{PipelineState, StageName};
use crate::collaborators::{RequestMetadata, RequestSource};

/// A state as it looks right after draft generation for the sample request.
///
/// The draft matches what [`super::ScriptedGenerator`] writes for the
/// request text.
#[must_use]
pub fn drafted_state() -> PipelineState {
    let text = "Build a pedestrian bridge.";
    let mut state = PipelineState::new(RequestSource::text(text));
    state.request_text = Some(text.to_string());
    state.ocr_text = Some(String::new());
    state.raw_tables = Some(Vec::new());
    state.metadata = Some(RequestMetadata {
        industry: "construction".to_string(),
        ..RequestMetadata::default()
    });
    state.references = Some(vec!["Past proposal A".to_string()]);
    state.table_summaries = Some(Vec::new());
    state.draft = Some(format!("Draft for: {text}"));
    state.stage_trace = vec![
        StageName::ExtractDocument,
        StageName::EnrichRequest,
        StageName::RetrieveReferences,
        StageName::SummarizeTables,
        StageName::GenerateDraft,
    ];
    state
}
