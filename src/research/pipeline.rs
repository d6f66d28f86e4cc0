//! Research pipeline driver
//!
//! Runs one query through every stage in order:
//!
//! 1. **Route** - pick the research category (falls back to interdisciplinary)
//! 2. **Plan** - build the search plan (falls back to a single search)
//! 3. **Search** - batched fan-out, failures become outcomes
//! 4. **Write** - synthesize the report with the category writer
//! 5. **Refine** - quality gate loop
//! 6. **Finalize** - save the markdown report
//!
//! Only an unreachable generation service at startup fails the run. Every
//! later stage degrades instead, so a completed run always carries a report.

use crate::agents::evaluator::ReportEvaluator;
use crate::agents::planner::SearchPlanner;
use crate::agents::router::ResearchRouter;
use crate::agents::{AgentRegistry, AgentRole};
use crate::research::artifacts::ArtifactStore;
use crate::research::progress::{ProgressSink, ResearchStage};
use crate::research::refinement::{RefinementLoop, RefinementState};
use crate::research::search::{SearchExecutor, SearchExecutorConfig, Searcher};
use crate::research::searchers::{CompositeSearcher, FileSearcher, WebSearcher};
use crate::research::synthesis::ReportSynthesizer;
use crate::types::{
    AppError, RefinementEntry, ReportRecord, ResearchCategory, Result, SearchMode, SearchOutcome,
    SearchPlan, SearchTask,
};
use crate::utils::toml_config::VidyaConfig;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// A search that did not produce results, as reported in a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedSearch {
    pub query: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SearchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failures: Vec<FailedSearch>,
}

impl SearchSummary {
    pub fn from_outcomes(outcomes: &[SearchOutcome]) -> Self {
        let failures: Vec<FailedSearch> = outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                SearchOutcome::Failure { task, reason } => Some(FailedSearch {
                    query: task.query.clone(),
                    reason: reason.clone(),
                }),
                SearchOutcome::Success { .. } => None,
            })
            .collect();

        Self {
            total: outcomes.len(),
            succeeded: outcomes.len() - failures.len(),
            failures,
        }
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone, Serialize)]
pub struct ResearchRun {
    pub run_id: Uuid,
    pub query: String,
    pub category: ResearchCategory,
    pub mode: SearchMode,
    pub plan: SearchPlan,
    pub searches: SearchSummary,
    pub report: ReportRecord,
    pub best_score: f64,
    pub refinement_state: RefinementState,
    pub history: Vec<RefinementEntry>,
    /// Where the markdown report was written, if it was
    pub report_path: Option<PathBuf>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
}

pub struct ResearchPipeline {
    registry: AgentRegistry,
    searcher: Arc<dyn Searcher>,
    config: VidyaConfig,
    artifacts: ArtifactStore,
    mode: SearchMode,
    files: Vec<PathBuf>,
    output: Option<PathBuf>,
}

impl ResearchPipeline {
    pub fn new(registry: AgentRegistry, searcher: Arc<dyn Searcher>, config: VidyaConfig) -> Self {
        let artifacts = if config.artifacts.enabled {
            ArtifactStore::new(config.artifacts.dir.clone())
        } else {
            ArtifactStore::disabled()
        };

        Self {
            registry,
            searcher,
            config,
            artifacts,
            mode: SearchMode::Web,
            files: Vec::new(),
            output: None,
        }
    }

    /// Pipeline searching the web through daedra and local files from disk.
    pub fn from_config(registry: AgentRegistry, config: VidyaConfig) -> Result<Self> {
        let web = WebSearcher::new(
            registry.agent(AgentRole::Search)?.clone(),
            Duration::from_secs(config.search.task_timeout_secs),
            config.search.results_per_query,
        );
        let files = FileSearcher::new(config.search.file_excerpt_chars);
        let searcher = CompositeSearcher::new(Some(Arc::new(web)), Some(Arc::new(files)));

        Ok(Self::new(registry, Arc::new(searcher), config))
    }

    pub fn with_mode(mut self, mode: SearchMode, files: Vec<PathBuf>) -> Self {
        self.mode = mode;
        self.files = files;
        self
    }

    pub fn with_artifacts(mut self, artifacts: ArtifactStore) -> Self {
        self.artifacts = artifacts;
        self
    }

    /// Write the final report here instead of the artifact directory.
    pub fn with_output(mut self, output: Option<PathBuf>) -> Self {
        self.output = output;
        self
    }

    pub async fn run(&self, query: &str, progress: &dyn ProgressSink) -> Result<ResearchRun> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidInput("Research query is empty".to_string()));
        }
        if self.mode.includes_files() && self.files.is_empty() {
            return Err(AppError::InvalidInput(format!(
                "Search mode '{:?}' needs at least one file",
                self.mode
            )));
        }

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let clock = Instant::now();
        tracing::info!(%run_id, query, mode = ?self.mode, "Starting research run");

        self.check_service().await?;

        // Route
        progress.working(ResearchStage::Routing, "Classifying query");
        let router = ResearchRouter::new(
            self.registry.agent(AgentRole::Router)?.clone(),
            self.config.pipeline.routing_timeout(),
        );
        let category = router.route(query).await?;
        progress.finished(ResearchStage::Routing, &format!("Category: {}", category));

        // Plan
        progress.working(ResearchStage::Planning, "Planning searches");
        let plan = self.plan_searches(query).await?;
        progress.finished(
            ResearchStage::Planning,
            &format!("{} searches planned", plan.searches.len()),
        );

        // Search
        let executor = SearchExecutor::new(
            self.searcher.clone(),
            SearchExecutorConfig::from(&self.config.search),
        );
        let outcomes = executor.execute(&plan, progress).await;
        let searches = SearchSummary::from_outcomes(&outcomes);

        // Write
        let writer = self
            .registry
            .agent(AgentRole::Writer(category))?
            .clone();
        progress.working(
            ResearchStage::Writing,
            &format!("Writing {} report with {}", category, writer.name()),
        );
        let synthesizer = ReportSynthesizer::new(self.config.synthesis.clone(), self.artifacts.clone());
        let (report, extracted_citations) = synthesizer
            .synthesize(query, category, &outcomes, &writer)
            .await;
        progress.finished(
            ResearchStage::Writing,
            &format!("Draft ready with {} citations", report.citation_count),
        );

        // Refine
        let evaluator = ReportEvaluator::new(
            self.registry.agent(AgentRole::Evaluator)?.clone(),
            Duration::from_secs(self.config.refinement.evaluator_timeout_secs),
        );
        let refinement = RefinementLoop::new(evaluator, writer, &self.config.refinement)
            .with_artifacts(self.artifacts.clone())
            .with_extracted_citations(extracted_citations)
            .refine(query, category, report, progress)
            .await;

        // Finalize
        progress.working(ResearchStage::Finalizing, "Saving report");
        let report_path = self.save(query, &refinement.report).await;
        progress.finished(
            ResearchStage::Finalizing,
            &match &report_path {
                Some(path) => format!("Report saved to {}", path.display()),
                None => "Report not saved".to_string(),
            },
        );

        let duration_ms = u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::info!(
            %run_id,
            %category,
            score = refinement.best_score,
            state = %refinement.final_state,
            duration_ms,
            "Research run finished"
        );

        Ok(ResearchRun {
            run_id,
            query: query.to_string(),
            category,
            mode: self.mode,
            plan,
            searches,
            report: refinement.report,
            best_score: refinement.best_score,
            refinement_state: refinement.final_state,
            history: refinement.history,
            report_path,
            started_at,
            finished_at: Utc::now(),
            duration_ms,
        })
    }

    /// Reachability of the generation service behind the router, the first
    /// agent a run calls.
    async fn check_service(&self) -> Result<()> {
        let router = self.registry.agent(AgentRole::Router)?;
        router.client().health_check().await.map_err(|err| match err {
            AppError::Unavailable(_) => err,
            other => AppError::Unavailable(other.to_string()),
        })
    }

    async fn plan_searches(&self, query: &str) -> Result<SearchPlan> {
        let mut plan = match self.mode {
            SearchMode::File => SearchPlan {
                searches: Vec::new(),
                priority_indices: Vec::new(),
                coverage_areas: vec!["Local documents".to_string()],
            },
            SearchMode::Web | SearchMode::WebAndFile => {
                let planner = SearchPlanner::new(
                    self.registry.agent(AgentRole::Planner)?.clone(),
                    self.config.pipeline.planning_timeout(),
                    self.config.search.max_tasks,
                );
                planner.plan(query).await
            }
        };

        if self.mode.includes_files() {
            plan.searches
                .extend(self.files.iter().map(|path| SearchTask::file(path.clone(), query)));
        }
        Ok(plan)
    }

    async fn save(&self, query: &str, report: &ReportRecord) -> Option<PathBuf> {
        if self.output.is_none() && self.artifacts.dir().is_none() {
            return None;
        }
        match self
            .artifacts
            .save_report(query, report, self.output.as_deref())
            .await
        {
            Ok(path) => Some(path),
            Err(err) => {
                tracing::warn!("Could not save report: {}", err);
                None
            }
        }
    }
}
