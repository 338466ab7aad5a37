//! Testing utilities for rfpflow workflows.
//!
//! This module provides:
//! - Scripted collaborator doubles with call counters
//! - Ready-made pipeline states

mod doubles;
mod fixtures;

pub use doubles::{
    sample_document, ComplianceScript, RecordingIndex, ScriptedCollaborators, ScriptedExtractor,
    ScriptedGenerator, ScriptedRetriever,
};
pub use fixtures::drafted_state;
