//! Shared handles a stage runs with.

use crate::collaborators::Collaborators;
use crate::config::FlowConfig;
use crate::events::{EventSink, FlowEvent, NoOpEventSink};
use crate::runs::RunId;
use crate::status::{AgentLabel, AgentState, StatusStore, TimingMarkers};
use std::fmt;
use std::sync::Arc;

/// Everything a stage may touch besides the pipeline state.
///
/// Cloning is cheap; every handle is reference counted. The registry clones
/// one base context per submitted run and stamps the run id on the copy.
#[derive(Clone)]
pub struct StageContext {
    run_id: Option<RunId>,
    collaborators: Collaborators,
    config: Arc<FlowConfig>,
    status: Arc<StatusStore>,
    markers: Arc<TimingMarkers>,
    events: Arc<dyn EventSink>,
}

impl StageContext {
    /// Creates a context with a fresh status store using the configured
    /// cooldown, fresh timing markers, and no event sink.
    #[must_use]
    pub fn new(collaborators: Collaborators, config: FlowConfig) -> Self {
        let status = Arc::new(StatusStore::new(config.status_cooldown()));
        Self {
            run_id: None,
            collaborators,
            config: Arc::new(config),
            status,
            markers: Arc::new(TimingMarkers::new()),
            events: Arc::new(NoOpEventSink),
        }
    }

    /// Replaces the collaborators.
    #[must_use]
    pub fn with_collaborators(mut self, collaborators: Collaborators) -> Self {
        self.collaborators = collaborators;
        self
    }

    /// Shares an existing status store.
    #[must_use]
    pub fn with_status(mut self, status: Arc<StatusStore>) -> Self {
        self.status = status;
        self
    }

    /// Shares existing timing markers.
    #[must_use]
    pub fn with_markers(mut self, markers: Arc<TimingMarkers>) -> Self {
        self.markers = markers;
        self
    }

    /// Installs an event sink.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Tags the context with the run it serves.
    #[must_use]
    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = Some(run_id);
        self
    }

    /// Returns the run id, if the walk belongs to a registered run.
    #[must_use]
    pub fn run_id(&self) -> Option<RunId> {
        self.run_id
    }

    /// Returns the collaborators.
    #[must_use]
    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// Returns the status store.
    #[must_use]
    pub fn status(&self) -> &Arc<StatusStore> {
        &self.status
    }

    /// Returns the timing markers.
    #[must_use]
    pub fn markers(&self) -> &Arc<TimingMarkers> {
        &self.markers
    }

    /// Returns the event sink.
    #[must_use]
    pub fn events(&self) -> &Arc<dyn EventSink> {
        &self.events
    }

    /// Reports a label state to the status board.
    pub fn report(&self, label: AgentLabel, state: AgentState, force: bool) -> bool {
        self.status.update(label, state, force)
    }

    /// Emits an event to the installed sink.
    pub fn emit(&self, event: &FlowEvent) {
        self.events.emit(event);
    }
}

impl fmt::Debug for StageContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageContext")
            .field("run_id", &self.run_id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
