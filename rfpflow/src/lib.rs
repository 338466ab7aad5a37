//! # Rfpflow
//!
//! A workflow executor that turns a request for proposal into a scored
//! proposal.
//!
//! A run walks a fixed graph of stages:
//!
//! - **Extraction and enrichment**: read the document, trim it, and pull
//!   request metadata
//! - **Drafting**: retrieve reference proposals, summarize tables, and write a
//!   first draft
//! - **Compliance loop**: optimize tone and re-check compliance, bounded by a
//!   maximum number of passes
//! - **Scoring**: score the final proposal and index it exactly once
//!
//! Every stage reports to a debounced status board with an audit log, and
//! runs are submitted and polled through a concurrent registry.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rfpflow::prelude::*;
//!
//! let service = ProposalService::new(collaborators, FlowConfig::from_env()?)?;
//!
//! let id = service.submit(RequestSource::path("rfp.pdf"))?;
//! match service.wait_for(id, Duration::from_secs(300)).await {
//!     WaitOutcome::Finished(record) => println!("{}", record.to_response()),
//!     other => eprintln!("run {id}: {other:?}"),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod catalog;
pub mod collaborators;
pub mod config;
pub mod errors;
pub mod events;
pub mod graph;
pub mod observability;
pub mod runs;
pub mod service;
pub mod stages;
pub mod status;
pub mod utils;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::catalog::{PipelineState, StageCatalog, StageName, StateField};
    pub use crate::collaborators::{
        ArtifactIndex, Collaborators, ContentGenerator, DocumentExtractor, ReferenceRetriever,
        RequestSource,
    };
    pub use crate::config::{FlowConfig, LogFormat};
    pub use crate::errors::{CollaboratorError, ExtractionError, FlowError, GraphValidationError};
    pub use crate::events::{EventSink, FlowEvent, LoggingEventSink, NoOpEventSink, RouteTarget};
    pub use crate::graph::{compliance_route, proposal_graph, Edge, GraphBuilder, WorkflowGraph};
    pub use crate::observability::init_from_config;
    pub use crate::runs::{Refinement, RunId, RunRecord, RunRegistry, RunStatus, WaitOutcome};
    pub use crate::service::ProposalService;
    pub use crate::stages::{Stage, StageContext};
    pub use crate::status::{AgentLabel, AgentState, PipelineDuration, StatusStore, TimingMarkers};
    pub use crate::utils::{generate_uuid, iso_timestamp, Timestamp};
    pub use std::time::Duration;
}
