//! End-to-end pipeline tests with scripted agents and searchers.

mod common;

use common::mocks::{
    evaluation_json, report_json, MockLLMClient, RecordingProgress, ScriptedSearcher,
    SearchBehavior,
};
use std::io::Write;
use std::sync::Arc;
use vidya::agents::AgentRole;
use vidya::research::progress::{NoopProgress, ResearchStage};
use vidya::research::refinement::RefinementState;
use vidya::research::search::Searcher;
use vidya::research::searchers::{CompositeSearcher, FileSearcher};
use vidya::types::{AppError, ResearchCategory, SearchMode, SearchSource};
use vidya::{AgentRegistry, ResearchPipeline, VidyaConfig};

const PLAN: &str = r#"{
    "searches": [
        {"reason": "Basics", "query": "rust ownership"},
        {"reason": "Details", "query": "rust borrow checker"},
        {"reason": "Context", "query": "rust lifetimes"}
    ],
    "priority_searches": [1],
    "areas_covered": ["Memory safety"]
}"#;

fn test_config() -> VidyaConfig {
    let mut config = VidyaConfig::default();
    config.artifacts.enabled = false;
    config.search.inter_batch_delay_ms = 0;
    config
}

struct Agents {
    router: MockLLMClient,
    planner: MockLLMClient,
    writer: MockLLMClient,
    evaluator: MockLLMClient,
}

impl Default for Agents {
    fn default() -> Self {
        Self {
            router: MockLLMClient::new("technical"),
            planner: MockLLMClient::new(PLAN),
            writer: MockLLMClient::new(&report_json(
                "# Ownership\n\nMoves (Reference 3) and borrows (Reference 5).\n\n## References\n3. Book\n5. Nomicon\n",
            )),
            evaluator: MockLLMClient::new(&evaluation_json(9.0, true)),
        }
    }
}

impl Agents {
    fn registry(self) -> AgentRegistry {
        let writer = Arc::new(self.writer);
        let mut registry = AgentRegistry::with_client(Arc::new(MockLLMClient::new("unused")))
            .with_agent_client(AgentRole::Router, Arc::new(self.router))
            .with_agent_client(AgentRole::Planner, Arc::new(self.planner))
            .with_agent_client(AgentRole::Evaluator, Arc::new(self.evaluator));
        for category in ResearchCategory::ALL {
            registry = registry.with_agent_client(AgentRole::Writer(category), writer.clone());
        }
        registry
    }
}

fn pipeline(agents: Agents, searcher: Arc<dyn Searcher>) -> ResearchPipeline {
    ResearchPipeline::new(agents.registry(), searcher, test_config())
}

#[tokio::test]
async fn test_full_run() {
    let searcher = Arc::new(ScriptedSearcher::new());
    let progress = RecordingProgress::new();

    let run = pipeline(Agents::default(), searcher.clone())
        .run("How does Rust manage memory?", &progress)
        .await
        .unwrap();

    assert_eq!(run.category, ResearchCategory::Technical);
    assert_eq!(run.plan.searches.len(), 3);
    assert_eq!(searcher.started()[0], "rust borrow checker");
    assert_eq!(run.searches.total, 3);
    assert_eq!(run.searches.succeeded, 3);
    assert_eq!(run.refinement_state, RefinementState::Satisfied);
    assert_eq!(run.best_score, 9.0);
    assert_eq!(run.history.len(), 1);
    assert_eq!(run.report.citation_count, 3);
    assert!(run
        .report
        .markdown_report
        .contains("Moves (Reference 1) and borrows (Reference 2)."));
    assert!(run.report_path.is_none());
    assert!(run.finished_at >= run.started_at);

    assert_eq!(
        progress.stages(),
        vec![
            ResearchStage::Routing,
            ResearchStage::Planning,
            ResearchStage::Searching,
            ResearchStage::Writing,
            ResearchStage::Refining,
            ResearchStage::Finalizing,
        ]
    );
}

#[tokio::test]
async fn test_unreachable_service_is_fatal() {
    let agents = Agents {
        router: MockLLMClient::unavailable(),
        ..Default::default()
    };

    let result = pipeline(agents, Arc::new(ScriptedSearcher::new()))
        .run("anything", &NoopProgress)
        .await;

    assert!(matches!(result, Err(AppError::Unavailable(_))));
}

#[tokio::test]
async fn test_routing_and_planning_fall_back() {
    let planner = Arc::new(MockLLMClient::failing(AppError::LLM("planner crashed".to_string())));
    let agents = Agents {
        router: MockLLMClient::new("no idea, sorry"),
        ..Default::default()
    };
    let searcher = Arc::new(ScriptedSearcher::new());
    let registry = agents
        .registry()
        .with_agent_client(AgentRole::Planner, planner.clone());

    let run = ResearchPipeline::new(registry, searcher.clone(), test_config())
        .run("  medieval trade routes  ", &NoopProgress)
        .await
        .unwrap();

    assert_eq!(planner.call_count(), 1);
    assert_eq!(run.category, ResearchCategory::Interdisciplinary);
    assert_eq!(run.plan.searches.len(), 1);
    assert_eq!(run.plan.searches[0].query, "medieval trade routes");
    assert_eq!(run.plan.priority_indices, vec![0]);
    assert_eq!(searcher.started(), vec!["medieval trade routes"]);
}

#[tokio::test]
async fn test_all_searches_failing_still_produces_report() {
    let searcher = Arc::new(
        ScriptedSearcher::new()
            .on("rust ownership", SearchBehavior::Fail("offline".to_string()))
            .on("rust borrow checker", SearchBehavior::Fail("offline".to_string()))
            .on("rust lifetimes", SearchBehavior::Fail("offline".to_string())),
    );

    let run = pipeline(Agents::default(), searcher)
        .run("How does Rust manage memory?", &NoopProgress)
        .await
        .unwrap();

    assert_eq!(run.searches.succeeded, 0);
    assert_eq!(run.searches.failures.len(), 3);
    assert!(run.searches.failures.iter().all(|f| f.reason.contains("offline")));
    assert!(!run.report.markdown_report.is_empty());
    // no citations were extracted, so the inline markers are counted
    assert_eq!(run.report.citation_count, 2);
}

#[tokio::test]
async fn test_file_mode_skips_planner() {
    let mut notes = tempfile::NamedTempFile::new().unwrap();
    write!(notes, "Borrowing rules: one mutable or many shared references.").unwrap();

    let planner = Arc::new(MockLLMClient::new(PLAN));
    let registry = Agents::default()
        .registry()
        .with_agent_client(AgentRole::Planner, planner.clone());
    let searcher = CompositeSearcher::new(None, Some(Arc::new(FileSearcher::default())));

    let run = ResearchPipeline::new(registry, Arc::new(searcher), test_config())
        .with_mode(SearchMode::File, vec![notes.path().to_path_buf()])
        .run("Summarize my notes", &NoopProgress)
        .await
        .unwrap();

    assert_eq!(planner.call_count(), 0);
    assert_eq!(run.plan.searches.len(), 1);
    assert_eq!(
        run.plan.searches[0].source,
        SearchSource::File(notes.path().to_path_buf())
    );
    assert_eq!(run.searches.succeeded, 1);
    assert_eq!(run.report.citation_count, 1);
}

#[tokio::test]
async fn test_web_and_file_mode_appends_file_tasks() {
    let run = pipeline(Agents::default(), Arc::new(ScriptedSearcher::new()))
        .with_mode(
            SearchMode::WebAndFile,
            vec!["a.md".into(), "b.md".into()],
        )
        .run("q", &NoopProgress)
        .await
        .unwrap();

    assert_eq!(run.plan.searches.len(), 5);
    assert_eq!(run.plan.searches[3].source, SearchSource::File("a.md".into()));
    assert_eq!(run.plan.searches[4].source, SearchSource::File("b.md".into()));
}

#[tokio::test]
async fn test_invalid_input_is_rejected() {
    let empty = pipeline(Agents::default(), Arc::new(ScriptedSearcher::new()))
        .run("   ", &NoopProgress)
        .await;
    assert!(matches!(empty, Err(AppError::InvalidInput(_))));

    let no_files = pipeline(Agents::default(), Arc::new(ScriptedSearcher::new()))
        .with_mode(SearchMode::File, vec![])
        .run("q", &NoopProgress)
        .await;
    assert!(matches!(no_files, Err(AppError::InvalidInput(_))));
}

#[tokio::test]
async fn test_report_written_to_output_path() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("nested").join("report.md");

    let run = pipeline(Agents::default(), Arc::new(ScriptedSearcher::new()))
        .with_output(Some(target.clone()))
        .run("How does Rust manage memory?", &NoopProgress)
        .await
        .unwrap();

    assert_eq!(run.report_path.as_deref(), Some(target.as_path()));
    let written = std::fs::read_to_string(&target).unwrap();
    assert!(written.starts_with("# Ownership\n\n*Generated on: "));
    assert!(written.contains("## Key Insights\n\n- An insight\n"));
}

#[tokio::test]
async fn test_run_serializes_to_json() {
    let run = pipeline(Agents::default(), Arc::new(ScriptedSearcher::new()))
        .run("q", &NoopProgress)
        .await
        .unwrap();

    let value = serde_json::to_value(&run).unwrap();
    assert_eq!(value["category"], "technical");
    assert_eq!(value["refinement_state"], "satisfied");
    assert_eq!(value["mode"], "web");
    assert!(value["run_id"].is_string());
    assert_eq!(value["history"].as_array().unwrap().len(), 1);
}
