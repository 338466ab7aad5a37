//! Debounced per-label status board with an append-only audit log.

use super::{AgentLabel, AgentState, AgentStatusEntry, AuditLogLine};
use crate::utils::now_utc;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Text returned by [`StatusStore::log_text`] while the log is empty.
pub const NO_LOGS_YET: &str = "No logs yet.";

/// Default minimum interval between accepted non-forced updates.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(1);

/// Snapshot of every label's entry.
pub type StatusSnapshot = BTreeMap<AgentLabel, AgentStatusEntry>;

#[derive(Debug, Default)]
struct Board {
    /// `None` until the first reset.
    entries: Option<StatusSnapshot>,
    log: Vec<AuditLogLine>,
    /// When the cooldown gate last let a call through.
    last_accepted: Option<Instant>,
}

impl Board {
    fn entries_mut(&mut self) -> &mut StatusSnapshot {
        self.entries.get_or_insert_with(waiting_board)
    }
}

fn waiting_board() -> StatusSnapshot {
    AgentLabel::ALL
        .into_iter()
        .map(|label| (label, AgentStatusEntry::waiting(label)))
        .collect()
}

/// Thread-safe status board shared by every run of a process.
///
/// Non-forced updates are debounced by a single cooldown clock shared across
/// all labels and all runs: one run's chatter can suppress another run's
/// non-forced updates. Forced updates always pass the gate. Either way a
/// write only happens when the label's state actually changes, and every
/// write appends exactly one audit line.
///
/// All mutation, including the cooldown gate, goes through one lock that is
/// never held across an `.await`.
#[derive(Debug)]
pub struct StatusStore {
    cooldown: Duration,
    board: Mutex<Board>,
}

impl Default for StatusStore {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

impl StatusStore {
    /// Creates a store with the given cooldown.
    #[must_use]
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            board: Mutex::new(Board::default()),
        }
    }

    /// Returns the configured cooldown.
    #[must_use]
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Sets every label back to waiting, clears the audit log, and rearms the
    /// cooldown gate.
    ///
    /// Updates that completed before the reset are not visible after it.
    pub fn reset(&self) {
        let mut board = self.board.lock();
        board.entries = Some(waiting_board());
        board.log.clear();
        board.last_accepted = None;
        debug!("Status board reset");
    }

    /// Records a new state for `label`.
    ///
    /// A non-forced call arriving within the cooldown of the last accepted
    /// call is dropped. An accepted call that does not change the label's
    /// state consumes the cooldown but writes nothing.
    ///
    /// Returns true if the entry was overwritten and an audit line appended.
    pub fn update(&self, label: AgentLabel, state: AgentState, force: bool) -> bool {
        let mut guard = self.board.lock();
        let board = &mut *guard;
        let now = Instant::now();

        if !force {
            if let Some(last) = board.last_accepted {
                if now.duration_since(last) < self.cooldown {
                    trace!(label = %label, state = %state, "Status update debounced");
                    return false;
                }
            }
        }
        board.last_accepted = Some(now);

        let entry = board
            .entries_mut()
            .entry(label)
            .or_insert_with(|| AgentStatusEntry::waiting(label));
        if entry.state == state {
            return false;
        }

        let timestamp = now_utc();
        entry.state = state.clone();
        entry.timestamp = Some(timestamp);

        debug!(label = %label, state = %state, force, "Status updated");
        board.log.push(AuditLogLine {
            timestamp,
            label,
            state,
        });
        true
    }

    /// Returns a snapshot of every label, initializing the board first if it
    /// has never been reset.
    pub fn snapshot(&self) -> StatusSnapshot {
        let mut board = self.board.lock();
        board.entries_mut().clone()
    }

    /// Returns the current state of one label.
    pub fn state_of(&self, label: AgentLabel) -> AgentState {
        self.snapshot()
            .get(&label)
            .map(|entry| entry.state.clone())
            .unwrap_or_default()
    }

    /// Returns the audit log lines in append order.
    #[must_use]
    pub fn log_lines(&self) -> Vec<AuditLogLine> {
        self.board.lock().log.clone()
    }

    /// Returns the audit log as text, or [`NO_LOGS_YET`] when it is empty.
    #[must_use]
    pub fn log_text(&self) -> String {
        let board = self.board.lock();
        if board.log.is_empty() {
            return NO_LOGS_YET.to_string();
        }
        board
            .log
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn slow_store() -> StatusStore {
        StatusStore::new(Duration::from_secs(60))
    }

    #[test]
    fn test_snapshot_initializes_waiting_board() {
        let store = StatusStore::default();
        let snapshot = store.snapshot();

        assert_eq!(snapshot.len(), AgentLabel::ALL.len());
        assert!(snapshot
            .values()
            .all(|entry| entry.state == AgentState::Waiting && entry.timestamp.is_none()));
    }

    #[test]
    fn test_log_sentinel_when_empty() {
        let store = StatusStore::default();
        assert_eq!(store.log_text(), NO_LOGS_YET);
    }

    #[test]
    fn test_first_update_is_accepted() {
        let store = slow_store();

        assert!(store.update(AgentLabel::Scorer, AgentState::InProgress, false));
        assert_eq!(store.state_of(AgentLabel::Scorer), AgentState::InProgress);
        assert!(store.snapshot()[&AgentLabel::Scorer].timestamp.is_some());
    }

    #[test]
    fn test_repeated_update_writes_one_line() {
        let store = StatusStore::new(Duration::ZERO);

        assert!(store.update(AgentLabel::Scorer, AgentState::Done, false));
        assert!(!store.update(AgentLabel::Scorer, AgentState::Done, false));

        assert_eq!(store.log_lines().len(), 1);
    }

    #[test]
    fn test_repeated_forced_update_writes_one_line() {
        let store = slow_store();

        store.update(AgentLabel::Scorer, AgentState::Done, true);
        store.update(AgentLabel::Scorer, AgentState::Done, true);

        assert_eq!(store.log_lines().len(), 1);
    }

    #[test]
    fn test_unforced_update_within_cooldown_is_dropped() {
        let store = slow_store();

        assert!(store.update(AgentLabel::ComplianceChecker, AgentState::InProgress, true));
        assert!(!store.update(AgentLabel::ComplianceChecker, AgentState::Done, false));

        assert_eq!(
            store.state_of(AgentLabel::ComplianceChecker),
            AgentState::InProgress
        );
        assert_eq!(store.log_lines().len(), 1);
    }

    #[test]
    fn test_forced_update_within_cooldown_applies() {
        let store = slow_store();

        store.update(AgentLabel::ComplianceChecker, AgentState::InProgress, true);
        assert!(store.update(AgentLabel::ComplianceChecker, AgentState::Done, true));

        assert_eq!(store.state_of(AgentLabel::ComplianceChecker), AgentState::Done);
        assert_eq!(store.log_lines().len(), 2);
    }

    #[test]
    fn test_cooldown_is_shared_across_labels() {
        let store = slow_store();

        store.update(AgentLabel::RfpAnalyzer, AgentState::InProgress, false);
        assert!(!store.update(AgentLabel::Scorer, AgentState::InProgress, false));
        assert_eq!(store.state_of(AgentLabel::Scorer), AgentState::Waiting);
    }

    #[test]
    fn test_unchanged_accepted_update_consumes_cooldown() {
        let store = slow_store();

        store.update(AgentLabel::Scorer, AgentState::Done, true);
        // Accepted but unchanged: no write, yet the gate is stamped.
        assert!(!store.update(AgentLabel::Scorer, AgentState::Done, true));
        assert!(!store.update(AgentLabel::RfpAnalyzer, AgentState::InProgress, false));
    }

    #[test]
    fn test_cooldown_elapses() {
        let store = StatusStore::new(Duration::from_millis(20));

        store.update(AgentLabel::Scorer, AgentState::InProgress, false);
        std::thread::sleep(Duration::from_millis(40));
        assert!(store.update(AgentLabel::Scorer, AgentState::Done, false));
    }

    #[test]
    fn test_reset_clears_log_and_rearms_gate() {
        let store = slow_store();
        store.update(AgentLabel::Scorer, AgentState::Done, true);

        store.reset();

        assert_eq!(store.log_text(), NO_LOGS_YET);
        assert_eq!(store.state_of(AgentLabel::Scorer), AgentState::Waiting);
        assert!(store.update(AgentLabel::Scorer, AgentState::InProgress, false));
    }

    #[test]
    fn test_log_text_format() {
        let store = slow_store();
        store.update(AgentLabel::TableSummarizer, AgentState::skipped("no tables"), true);
        store.update(AgentLabel::Scorer, AgentState::Done, true);

        let text = store.log_text();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("] Table Summarizer: Skipped (no tables)"));
        assert!(lines[1].ends_with("] Scorer: Done"));
    }

    #[test]
    fn test_concurrent_forced_updates_keep_every_line() {
        let store = Arc::new(slow_store());

        std::thread::scope(|scope| {
            for label in AgentLabel::ALL {
                let store = Arc::clone(&store);
                scope.spawn(move || {
                    for i in 0..25 {
                        store.update(label, AgentState::working(format!("step {i}")), true);
                    }
                });
            }
        });

        assert_eq!(store.log_lines().len(), AgentLabel::ALL.len() * 25);
        for label in AgentLabel::ALL {
            assert_eq!(store.state_of(label), AgentState::working("step 24"));
        }
    }
}
