//! Registry of submitted runs.

use super::{RunId, RunOutcome, RunRecord};
use crate::catalog::PipelineState;
use crate::collaborators::RequestSource;
use crate::events::FlowEvent;
use crate::graph::WorkflowGraph;
use crate::stages::StageContext;
use dashmap::DashMap;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, info_span, Instrument};

/// Result of waiting for a run.
#[derive(Debug, Clone, PartialEq)]
pub enum WaitOutcome {
    /// The run settled.
    Finished(RunRecord),
    /// The registry has no record of the run.
    NotFound,
    /// The run was still processing when the timeout elapsed.
    TimedOut,
}

/// Accepts runs, executes each one on its own tokio task, and answers polls.
///
/// Each record is written twice at most: once as Processing on submit and
/// once in its terminal form. A record removed by [`RunRegistry::clear`]
/// stays removed; the late result of its run is discarded.
#[derive(Debug, Clone)]
pub struct RunRegistry {
    runs: Arc<DashMap<RunId, RunRecord>>,
    graph: Arc<WorkflowGraph>,
    context: StageContext,
}

impl RunRegistry {
    /// Creates a registry executing `graph` with clones of `context`.
    #[must_use]
    pub fn new(graph: Arc<WorkflowGraph>, context: StageContext) -> Self {
        Self {
            runs: Arc::new(DashMap::new()),
            graph,
            context,
        }
    }

    /// Returns the base context runs are started with.
    #[must_use]
    pub fn context(&self) -> &StageContext {
        &self.context
    }

    /// Registers a run and starts it in the background.
    ///
    /// Returns as soon as the Processing record is stored. Must be called
    /// from within a tokio runtime.
    pub fn submit(&self, source: RequestSource) -> RunId {
        let id = RunId::new();
        self.runs.insert(id, RunRecord::processing(id));
        info!(run_id = %id, "Run submitted");
        self.context.emit(&FlowEvent::RunSubmitted { run_id: id });

        let runs = Arc::clone(&self.runs);
        let graph = Arc::clone(&self.graph);
        let ctx = self.context.clone().with_run_id(id);

        let span = info_span!("run", run_id = %id);
        let task = async move {
            let state = PipelineState::new(source);
            let outcome = match AssertUnwindSafe(graph.run(state, &ctx)).catch_unwind().await {
                Ok(Ok(state)) => RunOutcome::completed(state),
                Ok(Err(e)) => {
                    error!(run_id = %id, error = %e, "Run failed");
                    RunOutcome::failed(e.to_string())
                }
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    error!(run_id = %id, panic = %message, "Run panicked");
                    RunOutcome::failed(format!("Run panicked: {message}"))
                }
            };

            let status = outcome.status();
            if settle(&runs, id, outcome) {
                info!(run_id = %id, status = %status, "Run finished");
                ctx.emit(&FlowEvent::RunFinished { run_id: id, status });
            } else {
                debug!(run_id = %id, "Run record was cleared, result discarded");
            }
        };
        tokio::spawn(task.instrument(span));

        id
    }

    /// Returns a snapshot of a run, or `None` if the id is unknown.
    #[must_use]
    pub fn poll(&self, id: RunId) -> Option<RunRecord> {
        self.runs.get(&id).map(|record| record.clone())
    }

    /// Removes every record. Runs still executing keep going but their
    /// results are discarded.
    pub fn clear(&self) {
        let removed = self.runs.len();
        self.runs.clear();
        debug!(removed, "Run registry cleared");
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// Returns true if there are no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Returns the ids of every record.
    #[must_use]
    pub fn run_ids(&self) -> Vec<RunId> {
        self.runs.iter().map(|entry| *entry.key()).collect()
    }

    /// Polls every `interval` until the run settles, disappears, or
    /// `timeout` elapses. Never mutates the registry.
    pub async fn wait_for(&self, id: RunId, timeout: Duration, interval: Duration) -> WaitOutcome {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match self.poll(id) {
                None => return WaitOutcome::NotFound,
                Some(record) if record.is_terminal() => return WaitOutcome::Finished(record),
                Some(_) => {}
            }
            if tokio::time::Instant::now() >= deadline {
                return WaitOutcome::TimedOut;
            }
            tokio::time::sleep(interval).await;
        }
    }
}

/// Writes the terminal form of a run if its record is still processing.
fn settle(runs: &DashMap<RunId, RunRecord>, id: RunId, outcome: RunOutcome) -> bool {
    let Some(mut record) = runs.get_mut(&id) else {
        return false;
    };
    if record.is_terminal() {
        return false;
    }
    *record = record.finished(outcome);
    true
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
