//! Event sink trait and implementations.

use super::FlowEvent;
use parking_lot::RwLock;
use tracing::{debug, info, warn, Level};

/// Receives lifecycle events.
///
/// Emission happens on the executor's hot path, so implementations must not
/// block and must never panic.
pub trait EventSink: Send + Sync {
    /// Records an event.
    fn emit(&self, event: &FlowEvent);
}

/// A no-op event sink that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn emit(&self, _event: &FlowEvent) {}
}

/// An event sink that logs events using the tracing framework.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    /// The log level to use for routine events.
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a new logging event sink with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }
}

impl EventSink for LoggingEventSink {
    fn emit(&self, event: &FlowEvent) {
        let event_type = event.event_type();
        // Failures are always worth a warning, whatever the routine level.
        if let FlowEvent::StageFailed { stage, error, .. } = event {
            warn!(event_type, stage = %stage, error = %error, "Event: {}", event_type);
            return;
        }
        if self.level == Level::DEBUG {
            debug!(event_type, event_data = ?event, "Event: {}", event_type);
        } else {
            info!(event_type, event_data = ?event, "Event: {}", event_type);
        }
    }
}

/// A collecting event sink for tests and in-process inspection.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: RwLock<Vec<FlowEvent>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<FlowEvent> {
        self.events.read().clone()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Returns events whose type starts with a prefix such as `stage.`.
    #[must_use]
    pub fn events_of_type(&self, type_prefix: &str) -> Vec<FlowEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.event_type().starts_with(type_prefix))
            .cloned()
            .collect()
    }
}

impl EventSink for CollectingEventSink {
    fn emit(&self, event: &FlowEvent) {
        self.events.write().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StageName;
    use crate::events::RouteTarget;

    fn started(stage: StageName) -> FlowEvent {
        FlowEvent::StageStarted {
            run_id: None,
            stage,
        }
    }

    #[test]
    fn test_noop_sink() {
        NoOpEventSink.emit(&started(StageName::ExtractDocument));
    }

    #[test]
    fn test_logging_sink() {
        let sink = LoggingEventSink::default();
        sink.emit(&started(StageName::ExtractDocument));
        sink.emit(&FlowEvent::StageFailed {
            run_id: None,
            stage: StageName::ExtractDocument,
            error: "unreadable".to_string(),
        });
        LoggingEventSink::debug().emit(&started(StageName::ScoreProposal));
    }

    #[test]
    fn test_collecting_sink() {
        let sink = CollectingEventSink::new();
        assert!(sink.is_empty());

        sink.emit(&started(StageName::ExtractDocument));
        sink.emit(&started(StageName::EnrichRequest));

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.events()[1], started(StageName::EnrichRequest));
    }

    #[test]
    fn test_collecting_sink_filter() {
        let sink = CollectingEventSink::new();
        sink.emit(&started(StageName::ExtractDocument));
        sink.emit(&FlowEvent::StageCompleted {
            run_id: None,
            stage: StageName::ExtractDocument,
            duration_ms: 1.0,
        });
        sink.emit(&FlowEvent::RouteTaken {
            run_id: None,
            from: StageName::ExtractDocument,
            to: RouteTarget::Stage(StageName::EnrichRequest),
            conditional: false,
        });

        assert_eq!(sink.events_of_type("stage.").len(), 2);
        assert_eq!(sink.events_of_type("route.").len(), 1);

        sink.clear();
        assert!(sink.is_empty());
    }
}
