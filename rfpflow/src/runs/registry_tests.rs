//! Tests for the run registry.

#[cfg(test)]
mod tests {
    use crate::collaborators::RequestSource;
    use crate::errors::ExtractionError;
    use crate::events::CollectingEventSink;
    use crate::graph::proposal_graph;
    use crate::runs::{RunId, RunRegistry, RunStatus, WaitOutcome};
    use crate::status::{AgentLabel, AgentState};
    use crate::testing::{ScriptedCollaborators, ScriptedGenerator};
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    const TIMEOUT: Duration = Duration::from_secs(5);
    const INTERVAL: Duration = Duration::from_millis(5);

    fn registry(scripted: &ScriptedCollaborators) -> RunRegistry {
        let graph = proposal_graph(2).unwrap();
        RunRegistry::new(Arc::new(graph), scripted.context())
    }

    async fn finished(registry: &RunRegistry, id: RunId) -> crate::runs::RunRecord {
        match registry.wait_for(id, TIMEOUT, INTERVAL).await {
            WaitOutcome::Finished(record) => record,
            other => panic!("run did not finish: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_submit_returns_processing_record() {
        let scripted = ScriptedCollaborators::new()
            .with_generator(ScriptedGenerator::default().with_delay(Duration::from_millis(50)));
        let registry = registry(&scripted);

        let id = registry.submit(RequestSource::path("rfp.pdf"));

        let record = registry.poll(id).unwrap();
        assert_eq!(record.status, RunStatus::Processing);
        assert!(record.outcome.is_none());
    }

    #[tokio::test]
    async fn test_run_completes() {
        let scripted = ScriptedCollaborators::new();
        let registry = registry(&scripted);

        let id = registry.submit(RequestSource::path("rfp.pdf"));
        let record = finished(&registry, id).await;

        assert_eq!(record.status, RunStatus::Complete);
        let state = record.state().unwrap();
        assert_eq!(state.score_report.as_deref(), Some("Score: 8/10"));
        assert!(state.proposal_indexed);
        assert!(record.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_poll_unknown_id() {
        let registry = registry(&ScriptedCollaborators::new());

        assert!(registry.poll(RunId::new()).is_none());
        assert_eq!(
            registry.wait_for(RunId::new(), TIMEOUT, INTERVAL).await,
            WaitOutcome::NotFound
        );
    }

    #[tokio::test]
    async fn test_extraction_failure_fails_run() {
        let scripted = ScriptedCollaborators::new()
            .with_extraction_error(ExtractionError::unreadable("rfp.pdf", "file is encrypted"));
        let registry = registry(&scripted);

        let id = registry.submit(RequestSource::path("rfp.pdf"));
        let record = finished(&registry, id).await;

        assert_eq!(record.status, RunStatus::Failed);
        assert!(record.error().unwrap().contains("file is encrypted"));
        assert_eq!(scripted.generator.total_calls(), 0);
        assert_eq!(scripted.retriever.calls(), 0);
        assert!(matches!(
            registry.context().status().state_of(AgentLabel::RfpAnalyzer),
            AgentState::Failed(_)
        ));
    }

    #[tokio::test]
    async fn test_panic_is_recorded_as_failure() {
        let scripted = ScriptedCollaborators::new()
            .with_generator(ScriptedGenerator::default().panicking_on("generate_draft"));
        let registry = registry(&scripted);

        let id = registry.submit(RequestSource::path("rfp.pdf"));
        let record = finished(&registry, id).await;

        assert_eq!(record.status, RunStatus::Failed);
        assert!(record.error().unwrap().contains("scripted panic in generate_draft"));
    }

    #[tokio::test]
    async fn test_cleared_run_is_not_resurrected() {
        let scripted = ScriptedCollaborators::new()
            .with_generator(ScriptedGenerator::default().with_delay(Duration::from_millis(20)));
        let events = Arc::new(CollectingEventSink::new());
        let graph = proposal_graph(2).unwrap();
        let registry = RunRegistry::new(
            Arc::new(graph),
            scripted.context().with_events(events.clone()),
        );

        let id = registry.submit(RequestSource::path("rfp.pdf"));
        registry.clear();
        assert!(registry.is_empty());

        // Long enough for the whole run to finish in the background.
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert!(registry.poll(id).is_none());
        assert!(events.events_of_type("run.finished").is_empty());
    }

    #[tokio::test]
    async fn test_status_reset_mid_run_keeps_single_terminal_write() {
        let scripted = ScriptedCollaborators::new()
            .with_generator(ScriptedGenerator::default().with_delay(Duration::from_millis(10)));
        let events = Arc::new(CollectingEventSink::new());
        let graph = proposal_graph(2).unwrap();
        let registry = RunRegistry::new(
            Arc::new(graph),
            scripted.context().with_events(events.clone()),
        );

        let id = registry.submit(RequestSource::path("rfp.pdf"));
        tokio::time::sleep(Duration::from_millis(25)).await;
        registry.context().status().reset();

        let record = finished(&registry, id).await;

        assert_eq!(record.status, RunStatus::Complete);
        assert_eq!(events.events_of_type("run.finished").len(), 1);
        assert_eq!(registry.poll(id), Some(record));
    }

    #[tokio::test]
    async fn test_wait_for_times_out_without_mutating() {
        let scripted = ScriptedCollaborators::new()
            .with_generator(ScriptedGenerator::default().with_delay(Duration::from_secs(1)));
        let registry = registry(&scripted);

        let id = registry.submit(RequestSource::path("rfp.pdf"));
        let outcome = registry
            .wait_for(id, Duration::from_millis(20), INTERVAL)
            .await;

        assert_eq!(outcome, WaitOutcome::TimedOut);
        assert_eq!(registry.poll(id).unwrap().status, RunStatus::Processing);
    }

    #[tokio::test]
    async fn test_concurrent_runs_settle_independently() {
        let scripted = ScriptedCollaborators::new();
        let registry = registry(&scripted);

        let ids: Vec<RunId> = (0..5)
            .map(|i| registry.submit(RequestSource::text(format!("Request {i}"))))
            .collect();

        assert_eq!(ids.iter().collect::<HashSet<_>>().len(), 5);
        assert_eq!(registry.len(), 5);
        for id in &ids {
            assert_eq!(finished(&registry, *id).await.status, RunStatus::Complete);
        }

        let mut listed = registry.run_ids();
        listed.sort();
        let mut expected = ids.clone();
        expected.sort();
        assert_eq!(listed, expected);
    }
}
