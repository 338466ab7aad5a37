//! Pipeline start/end stamps for external duration measurement.

use crate::utils::{now_utc, Timestamp};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Default, Clone, Copy)]
struct Stamps {
    start: Option<Timestamp>,
    end: Option<Timestamp>,
}

/// The "pipeline start" and "pipeline end" stamps.
///
/// Both stamps come from the same UTC clock as status entries.
#[derive(Debug, Default)]
pub struct TimingMarkers {
    stamps: Mutex<Stamps>,
}

/// How long the most recent pipeline took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PipelineDuration {
    /// No start has been stamped.
    NotStarted,
    /// Started but not finished.
    Running {
        /// When the pipeline started.
        since: Timestamp,
    },
    /// Started and finished.
    Finished {
        /// Wall-clock time between the stamps.
        elapsed: Duration,
    },
}

impl fmt::Display for PipelineDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "No run recorded yet."),
            Self::Running { .. } => write!(f, "Pipeline still running"),
            Self::Finished { elapsed } => {
                write!(f, "Pipeline duration: {:.1} minutes", elapsed.as_secs_f64() / 60.0)
            }
        }
    }
}

impl TimingMarkers {
    /// Creates empty markers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamps the pipeline start and clears any previous end stamp.
    pub fn mark_start(&self) -> Timestamp {
        let now = now_utc();
        let mut stamps = self.stamps.lock();
        stamps.start = Some(now);
        stamps.end = None;
        now
    }

    /// Stamps the pipeline end.
    pub fn mark_end(&self) -> Timestamp {
        let now = now_utc();
        self.stamps.lock().end = Some(now);
        now
    }

    /// Returns the start stamp.
    #[must_use]
    pub fn start(&self) -> Option<Timestamp> {
        self.stamps.lock().start
    }

    /// Returns the end stamp.
    #[must_use]
    pub fn end(&self) -> Option<Timestamp> {
        self.stamps.lock().end
    }

    /// Clears both stamps.
    pub fn clear(&self) {
        *self.stamps.lock() = Stamps::default();
    }

    /// Reports the duration between the stamps.
    #[must_use]
    pub fn duration(&self) -> PipelineDuration {
        let stamps = *self.stamps.lock();
        match (stamps.start, stamps.end) {
            (None, _) => PipelineDuration::NotStarted,
            (Some(since), None) => PipelineDuration::Running { since },
            (Some(start), Some(end)) => PipelineDuration::Finished {
                elapsed: (end - start).to_std().unwrap_or_default(),
            },
        }
    }
}
