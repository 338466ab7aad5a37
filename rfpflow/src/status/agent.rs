//! Dashboard labels, their states, and audit log lines.

use crate::utils::{format_log_timestamp, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A dashboard label stages report progress under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentLabel {
    /// Document extraction and metadata enrichment.
    RfpAnalyzer,
    /// Reference retrieval.
    ContextRetriever,
    /// Table summarization.
    TableSummarizer,
    /// First draft generation.
    ProposalGenerator,
    /// Tone optimization.
    StrategyOptimizer,
    /// Compliance auditing.
    ComplianceChecker,
    /// Quality scoring.
    Scorer,
}

impl AgentLabel {
    /// Every known label, in dashboard order.
    pub const ALL: [Self; 7] = [
        Self::RfpAnalyzer,
        Self::ContextRetriever,
        Self::TableSummarizer,
        Self::ProposalGenerator,
        Self::StrategyOptimizer,
        Self::ComplianceChecker,
        Self::Scorer,
    ];

    /// Returns the display name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RfpAnalyzer => "RFP Analyzer",
            Self::ContextRetriever => "Context Retriever",
            Self::TableSummarizer => "Table Summarizer",
            Self::ProposalGenerator => "Proposal Generator",
            Self::StrategyOptimizer => "Strategy Optimizer",
            Self::ComplianceChecker => "Compliance Checker",
            Self::Scorer => "Scorer",
        }
    }
}

impl fmt::Display for AgentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The state shown for a label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum AgentState {
    /// Nothing has happened yet.
    Waiting,
    /// Work has started.
    InProgress,
    /// Work is underway with a specific activity.
    Working(String),
    /// Work finished.
    Done,
    /// Work was not needed.
    Skipped(String),
    /// Work failed.
    Failed(String),
}

impl Default for AgentState {
    fn default() -> Self {
        Self::Waiting
    }
}

impl AgentState {
    /// Creates a working state with a detail message.
    #[must_use]
    pub fn working(detail: impl Into<String>) -> Self {
        Self::Working(detail.into())
    }

    /// Creates a skipped state with a reason.
    #[must_use]
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped(reason.into())
    }

    /// Creates a failed state with a reason.
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }

    /// Returns true if the label will not change again during the run.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Done | Self::Skipped(_) | Self::Failed(_))
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "Waiting"),
            Self::InProgress => write!(f, "In progress"),
            Self::Working(detail) => write!(f, "{detail}"),
            Self::Done => write!(f, "Done"),
            Self::Skipped(reason) => write!(f, "Skipped ({reason})"),
            Self::Failed(reason) => write!(f, "Failed ({reason})"),
        }
    }
}

/// Current state of one label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStatusEntry {
    /// The label.
    pub label: AgentLabel,
    /// The current state.
    pub state: AgentState,
    /// When the state was last written; `None` after a reset.
    pub timestamp: Option<Timestamp>,
}

impl AgentStatusEntry {
    /// Creates a waiting entry with no timestamp.
    #[must_use]
    pub fn waiting(label: AgentLabel) -> Self {
        Self {
            label,
            state: AgentState::Waiting,
            timestamp: None,
        }
    }
}

/// One immutable line of the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogLine {
    /// When the change was accepted.
    pub timestamp: Timestamp,
    /// The label that changed.
    pub label: AgentLabel,
    /// The new state.
    pub state: AgentState,
}

impl fmt::Display for AuditLogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            format_log_timestamp(&self.timestamp),
            self.label,
            self.state
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_label_display() {
        assert_eq!(AgentLabel::RfpAnalyzer.to_string(), "RFP Analyzer");
        assert_eq!(AgentLabel::Scorer.to_string(), "Scorer");
    }

    #[test]
    fn test_state_display() {
        assert_eq!(AgentState::InProgress.to_string(), "In progress");
        assert_eq!(AgentState::skipped("no tables").to_string(), "Skipped (no tables)");
        assert_eq!(AgentState::working("Extracting contents").to_string(), "Extracting contents");
    }

    #[test]
    fn test_settled_states() {
        assert!(AgentState::Done.is_settled());
        assert!(AgentState::failed("boom").is_settled());
        assert!(!AgentState::InProgress.is_settled());
        assert!(!AgentState::Waiting.is_settled());
    }

    #[test]
    fn test_audit_line_format() {
        let line = AuditLogLine {
            timestamp: Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap(),
            label: AgentLabel::ComplianceChecker,
            state: AgentState::Done,
        };

        assert_eq!(line.to_string(), "[2025-01-02 03:04:05] Compliance Checker: Done");
    }

    #[test]
    fn test_state_serialize() {
        let json = serde_json::to_value(AgentState::skipped("no tables")).unwrap();
        assert_eq!(json["state"], "skipped");
        assert_eq!(json["detail"], "no tables");
    }
}
