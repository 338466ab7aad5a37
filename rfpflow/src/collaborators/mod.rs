//! Collaborator contracts consumed by the proposal stages.
//!
//! Document extraction, retrieval, content generation, and artifact indexing
//! live outside this crate. Stages only see these traits, so any backend
//! (a model API, a vector store, a test double) can be plugged in through
//! [`Collaborators`].

mod plain_text;
mod types;

pub use plain_text::PlainTextExtractor;
pub use types::{
    Artifact, ComplianceReport, ExtractedDocument, RequestMetadata, RequestSource, Table,
};

use crate::errors::{CollaboratorError, ExtractionError};
use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Reads a source document into text, OCR text, and tables.
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    /// Extracts the document at `path`.
    async fn extract(&self, path: &Path) -> Result<ExtractedDocument, ExtractionError>;
}

/// Content-generation calls made while drafting a proposal.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Extracts structured metadata. Best effort: implementations return
    /// defaults on malformed output instead of failing.
    async fn extract_metadata(&self, text: &str) -> RequestMetadata;

    /// Summarizes one markdown table.
    async fn summarize_table(&self, markdown: &str) -> Result<String, CollaboratorError>;

    /// Writes a first draft from the request, references, and table summaries.
    async fn generate_draft(
        &self,
        text: &str,
        references: &[String],
        table_summaries: &[String],
    ) -> Result<String, CollaboratorError>;

    /// Rewrites a draft for an industry and tone.
    async fn optimize_tone(
        &self,
        draft: &str,
        industry: &str,
        tone: &str,
    ) -> Result<String, CollaboratorError>;

    /// Audits a draft against the request text.
    async fn check_compliance(
        &self,
        text: &str,
        draft: &str,
    ) -> Result<ComplianceReport, CollaboratorError>;

    /// Produces a quality score report for a draft.
    async fn score_quality(&self, draft: &str) -> Result<String, CollaboratorError>;

    /// Revises a finished proposal using reviewer feedback.
    async fn refine_proposal(&self, proposal: &str, feedback: &str)
        -> Result<String, CollaboratorError>;
}

/// Similarity search over past proposals.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReferenceRetriever: Send + Sync {
    /// Returns up to `k` reference texts similar to `text`.
    async fn retrieve(&self, text: &str, k: usize) -> Result<Vec<String>, CollaboratorError>;
}

/// Stores finished proposals for future retrieval.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArtifactIndex: Send + Sync {
    /// Indexes an artifact.
    async fn index(&self, artifact: Artifact) -> Result<(), CollaboratorError>;
}

/// The set of collaborators a run uses.
#[derive(Clone)]
pub struct Collaborators {
    /// Document extractor.
    pub extractor: Arc<dyn DocumentExtractor>,
    /// Content generator.
    pub generator: Arc<dyn ContentGenerator>,
    /// Reference retriever.
    pub retriever: Arc<dyn ReferenceRetriever>,
    /// Artifact index.
    pub index: Arc<dyn ArtifactIndex>,
}

impl Collaborators {
    /// Bundles the four collaborators.
    #[must_use]
    pub fn new(
        extractor: Arc<dyn DocumentExtractor>,
        generator: Arc<dyn ContentGenerator>,
        retriever: Arc<dyn ReferenceRetriever>,
        index: Arc<dyn ArtifactIndex>,
    ) -> Self {
        Self {
            extractor,
            generator,
            retriever,
            index,
        }
    }

    /// Replaces the retriever.
    #[must_use]
    pub fn with_retriever(mut self, retriever: Arc<dyn ReferenceRetriever>) -> Self {
        self.retriever = retriever;
        self
    }

    /// Replaces the artifact index.
    #[must_use]
    pub fn with_index(mut self, index: Arc<dyn ArtifactIndex>) -> Self {
        self.index = index;
        self
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
