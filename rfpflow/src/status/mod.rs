//! Externally pollable progress state.
//!
//! This module provides:
//! - The per-label status board with its audit log
//! - Pipeline start/end timing markers

mod agent;
mod markers;
mod store;

pub use agent::{AgentLabel, AgentState, AgentStatusEntry, AuditLogLine};
pub use markers::{PipelineDuration, TimingMarkers};
pub use store::{StatusSnapshot, StatusStore, DEFAULT_COOLDOWN, NO_LOGS_YET};
