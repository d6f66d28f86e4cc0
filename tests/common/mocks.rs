//! Mock implementations for testing.
//!
//! Scripted LLM clients, searchers and progress sinks shared by the
//! integration tests, so no test needs a model server or the network.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use vidya::research::progress::{ProgressSink, ProgressUpdate, ResearchStage};
use vidya::research::search::{SearchFindings, Searcher};
use vidya::types::{AppError, Citation, Result, SearchTask};
use vidya::LLMClient;

/// Mock LLM client answering from a script.
///
/// Scripted responses are consumed in order; once the script is empty every
/// call gets the fallback response. Every prompt is recorded.
pub struct MockLLMClient {
    script: Mutex<VecDeque<Result<String>>>,
    fallback: Result<String>,
    delay: Option<Duration>,
    unavailable: bool,
    prompts: Mutex<Vec<String>>,
}

impl MockLLMClient {
    /// Create a mock client that always returns the given response.
    pub fn new(response: &str) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Ok(response.to_string()),
            delay: None,
            unavailable: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Responses returned in order, then `fallback` forever.
    pub fn scripted(responses: Vec<Result<String>>, fallback: &str) -> Self {
        Self {
            script: Mutex::new(responses.into()),
            ..Self::new(fallback)
        }
    }

    /// Create a mock client whose every generation fails with `error`.
    pub fn failing(error: AppError) -> Self {
        Self {
            fallback: Err(error),
            ..Self::new("")
        }
    }

    /// A client whose health check reports the service unreachable.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            fallback: Err(AppError::Unavailable("connection refused".to_string())),
            ..Self::new("")
        }
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    async fn respond(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.script.lock().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.respond(prompt).await
    }

    async fn generate_with_system(&self, _system: &str, prompt: &str) -> Result<String> {
        self.respond(prompt).await
    }

    async fn health_check(&self) -> Result<()> {
        if self.unavailable {
            return Err(AppError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// How the scripted searcher treats one query.
#[derive(Clone)]
pub enum SearchBehavior {
    Succeed(String),
    Fail(String),
    /// Sleep, then succeed
    Slow(Duration),
}

/// Searcher answering by query, recording start order and concurrency.
///
/// Queries without a scripted behavior succeed with one citation to
/// `https://example.com/<query>`.
#[derive(Default)]
pub struct ScriptedSearcher {
    behaviors: HashMap<String, SearchBehavior>,
    started: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedSearcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, query: &str, behavior: SearchBehavior) -> Self {
        self.behaviors.insert(query.to_string(), behavior);
        self
    }

    pub fn started(&self) -> Vec<String> {
        self.started.lock().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn findings(query: &str, summary: String) -> SearchFindings {
        SearchFindings {
            summary,
            citations: vec![Citation {
                url: format!("https://example.com/{}", query.replace(' ', "-")),
                title: format!("About {}", query),
                start_offset: 0,
                end_offset: 0,
            }],
        }
    }
}

#[async_trait]
impl Searcher for ScriptedSearcher {
    async fn search(&self, task: &SearchTask) -> Result<SearchFindings> {
        self.started.lock().push(task.query.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let result = match self.behaviors.get(&task.query).cloned() {
            Some(SearchBehavior::Succeed(summary)) => Ok(Self::findings(&task.query, summary)),
            Some(SearchBehavior::Fail(reason)) => Err(AppError::Search(reason)),
            Some(SearchBehavior::Slow(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(Self::findings(&task.query, format!("Slow results for {}", task.query)))
            }
            None => Ok(Self::findings(
                &task.query,
                format!("Results for {}", task.query),
            )),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Progress sink keeping every update.
#[derive(Default)]
pub struct RecordingProgress {
    updates: Mutex<Vec<ProgressUpdate>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<ProgressUpdate> {
        self.updates.lock().clone()
    }

    /// Stages in the order they first reported.
    pub fn stages(&self) -> Vec<ResearchStage> {
        let mut stages = Vec::new();
        for update in self.updates.lock().iter() {
            if !stages.contains(&update.stage) {
                stages.push(update.stage);
            }
        }
        stages
    }
}

impl ProgressSink for RecordingProgress {
    fn update(&self, update: ProgressUpdate) {
        self.updates.lock().push(update);
    }
}

// ============= Canned generation output =============

/// Evaluator verdict as the model would print it.
pub fn evaluation_json(score: f64, meets_standards: bool) -> String {
    serde_json::json!({
        "overall_score": score,
        "meets_standards": meets_standards,
        "detailed_feedback": format!("Scored {}", score),
        "improvement_suggestions": ["Add more sources"],
        "weaknesses": ["Thin evidence"]
    })
    .to_string()
}

/// Writer answer with a structured report.
pub fn report_json(body: &str) -> String {
    serde_json::json!({
        "short_summary": "A short summary.",
        "markdown_report": body,
        "follow_up_questions": ["What next?"],
        "key_insights": ["An insight"],
        "information_gaps": [],
        "methodological_approach": "Literature review"
    })
    .to_string()
}
