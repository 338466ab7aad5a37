//! Error types for the rfpflow executor.
//!
//! Stage failures are fatal for the run that raised them. Compliance failures
//! and exhausted optimization attempts are not errors at all; they are
//! ordinary outcomes recorded in the pipeline state.

use crate::catalog::{StageName, StateField};
use crate::runs::RunId;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for rfpflow operations.
#[derive(Debug, Error)]
pub enum FlowError {
    /// The source document could not be extracted.
    #[error("{0}")]
    Extraction(#[from] ExtractionError),

    /// A collaborator call failed.
    #[error("{0}")]
    Collaborator(#[from] CollaboratorError),

    /// The workflow graph is malformed.
    #[error("{0}")]
    Validation(#[from] GraphValidationError),

    /// A stage read a state field no earlier stage populated.
    #[error("Stage '{stage}' read '{field}' before any stage produced it")]
    MissingField {
        /// The reading stage.
        stage: StageName,
        /// The missing field.
        field: StateField,
    },

    /// The walk reached a stage that is not registered in the graph.
    #[error("Stage '{0}' is not registered in the workflow graph")]
    UnknownStage(StageName),

    /// The walk exceeded the configured number of stage invocations.
    #[error("Run exceeded the limit of {limit} stage invocations")]
    StepLimitExceeded {
        /// The configured limit.
        limit: usize,
    },

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A caller request was rejected before any work started.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The run is unknown, still processing, or failed, so it has no
    /// proposal to work on.
    #[error("Run '{0}' has no proposal to refine")]
    NoProposal(RunId),

    /// A generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FlowError {
    /// Creates a missing field error.
    #[must_use]
    pub fn missing_field(stage: StageName, field: StateField) -> Self {
        Self::MissingField { stage, field }
    }
}

/// Error raised when the source document is unreadable or unsupported.
#[derive(Debug, Clone, Error)]
pub enum ExtractionError {
    /// The document could not be read.
    #[error("Failed to read '{}': {reason}", .path.display())]
    Unreadable {
        /// The source path.
        path: PathBuf,
        /// Why the read failed.
        reason: String,
    },

    /// The document format is not supported by the extractor.
    #[error("Unsupported document format: '{}'", .path.display())]
    Unsupported {
        /// The source path.
        path: PathBuf,
    },

    /// The document contained no extractable text.
    #[error("No text could be extracted from '{}'", .path.display())]
    Empty {
        /// The source path.
        path: PathBuf,
    },
}

impl ExtractionError {
    /// Creates an unreadable document error.
    #[must_use]
    pub fn unreadable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Unreadable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates an unsupported format error.
    #[must_use]
    pub fn unsupported(path: impl Into<PathBuf>) -> Self {
        Self::Unsupported { path: path.into() }
    }
}

/// Error raised when a generation, check, or retrieval call fails.
#[derive(Debug, Error)]
#[error("Collaborator '{operation}' failed: {source}")]
pub struct CollaboratorError {
    /// The collaborator operation that failed (e.g. "generate_draft").
    pub operation: &'static str,
    /// The underlying failure.
    #[source]
    pub source: anyhow::Error,
}

impl CollaboratorError {
    /// Creates a collaborator error for an operation.
    #[must_use]
    pub fn new(operation: &'static str, source: impl Into<anyhow::Error>) -> Self {
        Self {
            operation,
            source: source.into(),
        }
    }

    /// Creates a collaborator error from a plain message.
    #[must_use]
    pub fn msg(operation: &'static str, message: impl std::fmt::Display) -> Self {
        Self {
            operation,
            source: anyhow::anyhow!("{message}"),
        }
    }
}

/// Error raised when building a workflow graph fails.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct GraphValidationError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<StageName>,
}

impl GraphValidationError {
    /// Creates a new graph validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<StageName>) -> Self {
        self.stages = stages;
        self
    }
}

/// Error raised when unconditional edges form a cycle.
#[derive(Debug, Clone, Error)]
#[error("Cycle detected through unconditional edges: {}", render_path(.cycle_path))]
pub struct CycleDetectedError {
    /// The path of stages forming the cycle.
    pub cycle_path: Vec<StageName>,
}

impl CycleDetectedError {
    /// Creates a new cycle detected error.
    #[must_use]
    pub fn new(cycle_path: Vec<StageName>) -> Self {
        Self { cycle_path }
    }
}

impl From<CycleDetectedError> for GraphValidationError {
    fn from(err: CycleDetectedError) -> Self {
        GraphValidationError {
            message: err.to_string(),
            stages: err.cycle_path,
        }
    }
}

fn render_path(path: &[StageName]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}
