use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

// ============= Research Categories =============

/// Domain a research query is routed to. Decides which writer agent
/// produces and refines the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResearchCategory {
    Scientific,
    Technical,
    Humanities,
    #[default]
    Interdisciplinary,
}

impl ResearchCategory {
    /// All categories, in routing-prompt order.
    pub const ALL: [ResearchCategory; 4] = [
        ResearchCategory::Scientific,
        ResearchCategory::Technical,
        ResearchCategory::Humanities,
        ResearchCategory::Interdisciplinary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResearchCategory::Scientific => "scientific",
            ResearchCategory::Technical => "technical",
            ResearchCategory::Humanities => "humanities",
            ResearchCategory::Interdisciplinary => "interdisciplinary",
        }
    }
}

impl fmt::Display for ResearchCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============= Model Tiers =============

/// Context-size class of a model. Drives the synthesizer's truncation budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    Small,
    #[default]
    Large,
}

// ============= Search Types =============

/// Which sources a run searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    #[default]
    Web,
    File,
    #[value(name = "web_and_file")]
    WebAndFile,
}

impl SearchMode {
    pub fn includes_web(&self) -> bool {
        matches!(self, SearchMode::Web | SearchMode::WebAndFile)
    }

    pub fn includes_files(&self) -> bool {
        matches!(self, SearchMode::File | SearchMode::WebAndFile)
    }
}

/// Where a search task looks.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "path", rename_all = "lowercase")]
pub enum SearchSource {
    #[default]
    Web,
    File(PathBuf),
}

/// One planned search. Immutable once the plan is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchTask {
    pub reason: String,
    pub query: String,
    #[serde(default)]
    pub source: SearchSource,
}

impl SearchTask {
    pub fn web(reason: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            query: query.into(),
            source: SearchSource::Web,
        }
    }

    pub fn file(path: impl Into<PathBuf>, query: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            reason: format!("Search local file {}", path.display()),
            query: query.into(),
            source: SearchSource::File(path),
        }
    }
}

/// Planner output: the tasks plus the indices to run first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchPlan {
    pub searches: Vec<SearchTask>,
    /// Indices into `searches`, executed before all other tasks.
    pub priority_indices: Vec<usize>,
    /// Descriptive only.
    pub coverage_areas: Vec<String>,
}

impl SearchPlan {
    /// Single-task plan searching for the raw query.
    pub fn fallback(query: &str) -> Self {
        Self {
            searches: vec![SearchTask::web("Main query search", query)],
            priority_indices: vec![0],
            coverage_areas: vec!["General overview".to_string()],
        }
    }
}

/// A source referenced by a search result. Offsets are zero when unknown.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Citation {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub start_offset: usize,
    #[serde(default)]
    pub end_offset: usize,
}

/// Tagged result of one search task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SearchOutcome {
    Success {
        task: SearchTask,
        summary: String,
        citations: Vec<Citation>,
    },
    Failure {
        task: SearchTask,
        reason: String,
    },
}

impl SearchOutcome {
    pub fn failure(task: SearchTask, reason: impl Into<String>) -> Self {
        SearchOutcome::Failure {
            task,
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SearchOutcome::Success { .. })
    }

    pub fn task(&self) -> &SearchTask {
        match self {
            SearchOutcome::Success { task, .. } | SearchOutcome::Failure { task, .. } => task,
        }
    }
}

// ============= Report Types =============

pub const DEFAULT_METHODOLOGY: &str =
    "Synthesis of web and document search results gathered for the query";

fn default_methodology() -> String {
    DEFAULT_METHODOLOGY.to_string()
}

/// Canonical report shape every generation path converges to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReportRecord {
    #[serde(default)]
    pub short_summary: String,
    #[serde(default)]
    pub markdown_report: String,
    #[serde(default)]
    pub follow_up_questions: Vec<String>,
    #[serde(default)]
    pub key_insights: Vec<String>,
    #[serde(default)]
    pub information_gaps: Vec<String>,
    #[serde(default = "default_methodology")]
    pub methodological_approach: String,
    #[serde(default)]
    pub citation_count: usize,
}

impl ReportRecord {
    pub fn new(short_summary: impl Into<String>, markdown_report: impl Into<String>) -> Self {
        Self {
            short_summary: short_summary.into(),
            markdown_report: markdown_report.into(),
            follow_up_questions: Vec::new(),
            key_insights: Vec::new(),
            information_gaps: Vec::new(),
            methodological_approach: default_methodology(),
            citation_count: 0,
        }
    }
}

/// Evaluator verdict on a report. Accepts both the detailed rubric shape
/// and the older `score`/`feedback`/`improvements` shape.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Evaluation {
    #[serde(alias = "score")]
    pub overall_score: f64,
    #[serde(default)]
    pub meets_standards: bool,
    #[serde(default, alias = "feedback")]
    pub detailed_feedback: String,
    #[serde(default)]
    pub summary_feedback: String,
    #[serde(default, alias = "improvements")]
    pub improvement_suggestions: Vec<String>,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
}

impl Evaluation {
    /// Score forced into `[0, 10]`; NaN becomes 0.
    pub fn clamped(mut self) -> Self {
        self.overall_score = if self.overall_score.is_nan() {
            0.0
        } else {
            self.overall_score.clamp(0.0, 10.0)
        };
        self
    }

    /// Detailed feedback, or the summary when the evaluator gave none.
    pub fn feedback(&self) -> &str {
        if self.detailed_feedback.trim().is_empty() {
            &self.summary_feedback
        } else {
            &self.detailed_feedback
        }
    }
}

/// One refinement iteration as recorded in the run history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinementEntry {
    pub iteration: usize,
    pub score: f64,
    pub feedback: String,
}

// ============= Error Types =============

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppError {
    #[error("LLM error: {0}")]
    LLM(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Generation service unavailable: {0}")]
    Unavailable(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Timeouts and unparseable output are always recovered with a fallback
    /// value instead of ending the current stage.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AppError::Timeout(_) | AppError::Parse(_))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => AppError::NotFound(err.to_string()),
            _ => AppError::Io(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Parse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
