//! Asynchronous run submission and polling.
//!
//! This module provides:
//! - Run ids, statuses, and records
//! - The registry that executes runs on supervised tokio tasks
//! - Revisions of finished proposals

mod record;
mod refinement;
mod registry;
#[cfg(test)]
mod registry_tests;

pub use record::{RunId, RunOutcome, RunRecord, RunStatus};
pub use refinement::Refinement;
pub use registry::{RunRegistry, WaitOutcome};
