//! Scripted collaborator doubles.

use crate::collaborators::{
    Artifact, ArtifactIndex, Collaborators, ComplianceReport, ContentGenerator, DocumentExtractor,
    ExtractedDocument, ReferenceRetriever, RequestMetadata, Table,
};
use crate::config::FlowConfig;
use crate::errors::{CollaboratorError, ExtractionError};
use crate::stages::StageContext;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// How the scripted generator answers compliance checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplianceScript {
    /// Every check passes.
    AlwaysPass,
    /// Every check fails.
    AlwaysFail,
    /// Checks fail until the given 1-based check, which passes.
    PassOnCheck(u32),
}

/// Extractor returning a fixed document or a fixed error.
#[derive(Debug)]
pub struct ScriptedExtractor {
    result: Result<ExtractedDocument, ExtractionError>,
    calls: Mutex<usize>,
}

impl ScriptedExtractor {
    /// Creates an extractor that returns `document`.
    #[must_use]
    pub fn returning(document: ExtractedDocument) -> Self {
        Self {
            result: Ok(document),
            calls: Mutex::new(0),
        }
    }

    /// Creates an extractor that fails with `error`.
    #[must_use]
    pub fn failing(error: ExtractionError) -> Self {
        Self {
            result: Err(error),
            calls: Mutex::new(0),
        }
    }

    /// Returns the number of extract calls.
    #[must_use]
    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }
}

#[async_trait]
impl DocumentExtractor for ScriptedExtractor {
    async fn extract(&self, _path: &Path) -> Result<ExtractedDocument, ExtractionError> {
        *self.calls.lock() += 1;
        self.result.clone()
    }
}

/// Deterministic content generator.
///
/// Outputs are derived from the inputs so tests can assert on them:
/// drafts are `Draft for: {text}`, optimized drafts are
/// `[{tone}/{industry}] {draft}`, table summaries count rows, and refined
/// proposals append `Revised for: {feedback}`.
#[derive(Debug)]
pub struct ScriptedGenerator {
    compliance: ComplianceScript,
    failing_operation: Option<&'static str>,
    panic_operation: Option<&'static str>,
    delay: Duration,
    calls: Mutex<Vec<&'static str>>,
}

impl Default for ScriptedGenerator {
    fn default() -> Self {
        Self::new(ComplianceScript::AlwaysPass)
    }
}

impl ScriptedGenerator {
    /// Creates a generator with a compliance script.
    #[must_use]
    pub fn new(compliance: ComplianceScript) -> Self {
        Self {
            compliance,
            failing_operation: None,
            panic_operation: None,
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Makes `operation` return an error.
    #[must_use]
    pub fn failing_on(mut self, operation: &'static str) -> Self {
        self.failing_operation = Some(operation);
        self
    }

    /// Makes `operation` panic.
    #[must_use]
    pub fn panicking_on(mut self, operation: &'static str) -> Self {
        self.panic_operation = Some(operation);
        self
    }

    /// Sleeps before answering every call.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Returns the operations called, in order.
    #[must_use]
    pub fn call_log(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }

    /// Returns how many times `operation` was called.
    #[must_use]
    pub fn calls_to(&self, operation: &str) -> usize {
        self.calls.lock().iter().filter(|op| **op == operation).count()
    }

    /// Returns the total number of calls.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    async fn enter(&self, operation: &'static str) -> Result<u32, CollaboratorError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let nth = {
            let mut calls = self.calls.lock();
            calls.push(operation);
            calls.iter().filter(|op| **op == operation).count()
        };
        if self.panic_operation == Some(operation) {
            panic!("scripted panic in {operation}");
        }
        if self.failing_operation == Some(operation) {
            return Err(CollaboratorError::msg(operation, "scripted failure"));
        }
        Ok(u32::try_from(nth).unwrap_or(u32::MAX))
    }
}

#[async_trait]
impl ContentGenerator for ScriptedGenerator {
    async fn extract_metadata(&self, _text: &str) -> RequestMetadata {
        if self.enter("extract_metadata").await.is_err() {
            return RequestMetadata::default();
        }
        RequestMetadata {
            project_name: "Pedestrian bridge".to_string(),
            client_name: "City of Springfield".to_string(),
            deadline: "2025-06-30".to_string(),
            industry: "construction".to_string(),
            region: String::new(),
            constraints: vec!["budget cap".to_string(), "budget cap".to_string()],
            client_needs: vec!["durability".to_string()],
        }
    }

    async fn summarize_table(&self, markdown: &str) -> Result<String, CollaboratorError> {
        self.enter("summarize_table").await?;
        Ok(format!("summary of {} rows", markdown.lines().count()))
    }

    async fn generate_draft(
        &self,
        text: &str,
        _references: &[String],
        _table_summaries: &[String],
    ) -> Result<String, CollaboratorError> {
        self.enter("generate_draft").await?;
        Ok(format!("Draft for: {text}"))
    }

    async fn optimize_tone(
        &self,
        draft: &str,
        industry: &str,
        tone: &str,
    ) -> Result<String, CollaboratorError> {
        self.enter("optimize_tone").await?;
        Ok(format!("[{tone}/{industry}] {draft}"))
    }

    async fn check_compliance(
        &self,
        _text: &str,
        _draft: &str,
    ) -> Result<ComplianceReport, CollaboratorError> {
        let nth = self.enter("check_compliance").await?;
        let passed = match self.compliance {
            ComplianceScript::AlwaysPass => true,
            ComplianceScript::AlwaysFail => false,
            ComplianceScript::PassOnCheck(n) => nth >= n,
        };
        Ok(if passed {
            ComplianceReport::passed(format!("check {nth}: all requirements addressed"))
        } else {
            ComplianceReport::failed(format!("check {nth}: pricing section missing"))
        })
    }

    async fn score_quality(&self, _draft: &str) -> Result<String, CollaboratorError> {
        self.enter("score_quality").await?;
        Ok("Score: 8/10".to_string())
    }

    async fn refine_proposal(
        &self,
        proposal: &str,
        feedback: &str,
    ) -> Result<String, CollaboratorError> {
        self.enter("refine_proposal").await?;
        Ok(format!("{proposal}\n\nRevised for: {feedback}"))
    }
}

/// Retriever returning fixed references or failing every call.
#[derive(Debug)]
pub struct ScriptedRetriever {
    references: Vec<String>,
    outage: bool,
    calls: Mutex<usize>,
}

impl ScriptedRetriever {
    /// Creates a retriever that returns `references` regardless of `k`.
    #[must_use]
    pub fn returning(references: Vec<String>) -> Self {
        Self {
            references,
            outage: false,
            calls: Mutex::new(0),
        }
    }

    /// Creates a retriever whose every call fails.
    #[must_use]
    pub fn outage() -> Self {
        Self {
            references: Vec::new(),
            outage: true,
            calls: Mutex::new(0),
        }
    }

    /// Returns the number of retrieve calls.
    #[must_use]
    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }
}

#[async_trait]
impl ReferenceRetriever for ScriptedRetriever {
    async fn retrieve(&self, _text: &str, _k: usize) -> Result<Vec<String>, CollaboratorError> {
        *self.calls.lock() += 1;
        if self.outage {
            return Err(CollaboratorError::msg("retrieve", "vector store unavailable"));
        }
        Ok(self.references.clone())
    }
}

/// Artifact index that records what it was given.
#[derive(Debug, Default)]
pub struct RecordingIndex {
    artifacts: Mutex<Vec<Artifact>>,
    fail: bool,
}

impl RecordingIndex {
    /// Creates an index that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an index that records then rejects every artifact.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            artifacts: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Returns the indexed artifacts.
    #[must_use]
    pub fn artifacts(&self) -> Vec<Artifact> {
        self.artifacts.lock().clone()
    }
}

#[async_trait]
impl ArtifactIndex for RecordingIndex {
    async fn index(&self, artifact: Artifact) -> Result<(), CollaboratorError> {
        if self.fail {
            return Err(CollaboratorError::msg("index", "index is read-only"));
        }
        self.artifacts.lock().push(artifact);
        Ok(())
    }
}

/// The request document every scripted run extracts by default.
#[must_use]
pub fn sample_document() -> ExtractedDocument {
    ExtractedDocument {
        text: "Build a pedestrian bridge.".to_string(),
        ocr_text: "Scanned appendix: load limits".to_string(),
        tables: vec![Table::from_cells(vec![
            vec!["Item", "Qty"],
            vec!["Steel", "10"],
        ])],
    }
}

/// A full set of scripted collaborators with handles for assertions.
#[derive(Debug, Clone)]
pub struct ScriptedCollaborators {
    /// The extractor double.
    pub extractor: Arc<ScriptedExtractor>,
    /// The generator double.
    pub generator: Arc<ScriptedGenerator>,
    /// The retriever double.
    pub retriever: Arc<ScriptedRetriever>,
    /// The index double.
    pub index: Arc<RecordingIndex>,
}

impl Default for ScriptedCollaborators {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedCollaborators {
    /// Creates doubles that extract [`sample_document`], pass compliance on
    /// the first check, and return four references.
    #[must_use]
    pub fn new() -> Self {
        Self {
            extractor: Arc::new(ScriptedExtractor::returning(sample_document())),
            generator: Arc::new(ScriptedGenerator::default()),
            retriever: Arc::new(ScriptedRetriever::returning(
                ["Past proposal A", "Past proposal B", "Past proposal C", "Past proposal D"]
                    .map(String::from)
                    .to_vec(),
            )),
            index: Arc::new(RecordingIndex::new()),
        }
    }

    /// Replaces the extracted document.
    #[must_use]
    pub fn with_document(mut self, document: ExtractedDocument) -> Self {
        self.extractor = Arc::new(ScriptedExtractor::returning(document));
        self
    }

    /// Makes extraction fail.
    #[must_use]
    pub fn with_extraction_error(mut self, error: ExtractionError) -> Self {
        self.extractor = Arc::new(ScriptedExtractor::failing(error));
        self
    }

    /// Sets the compliance script.
    #[must_use]
    pub fn with_compliance(mut self, script: ComplianceScript) -> Self {
        self.generator = Arc::new(ScriptedGenerator::new(script));
        self
    }

    /// Replaces the generator.
    #[must_use]
    pub fn with_generator(mut self, generator: ScriptedGenerator) -> Self {
        self.generator = Arc::new(generator);
        self
    }

    /// Makes one generator operation fail.
    #[must_use]
    pub fn with_failing_operation(self, operation: &'static str) -> Self {
        self.with_generator(ScriptedGenerator::default().failing_on(operation))
    }

    /// Makes every retrieval fail.
    #[must_use]
    pub fn with_retrieval_outage(mut self) -> Self {
        self.retriever = Arc::new(ScriptedRetriever::outage());
        self
    }

    /// Makes every indexing call fail.
    #[must_use]
    pub fn with_failing_index(mut self) -> Self {
        self.index = Arc::new(RecordingIndex::failing());
        self
    }

    /// Bundles the doubles for a stage context.
    #[must_use]
    pub fn collaborators(&self) -> Collaborators {
        Collaborators::new(
            self.extractor.clone(),
            self.generator.clone(),
            self.retriever.clone(),
            self.index.clone(),
        )
    }

    /// Returns a context over these doubles with no status cooldown.
    #[must_use]
    pub fn context(&self) -> StageContext {
        self.context_with(FlowConfig::default().with_status_cooldown(Duration::ZERO))
    }

    /// Returns a context over these doubles with `config`.
    #[must_use]
    pub fn context_with(&self, config: FlowConfig) -> StageContext {
        StageContext::new(self.collaborators(), config)
    }
}
