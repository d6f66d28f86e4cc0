//! Report synthesis
//!
//! Turns search outcomes into a [`ReportRecord`]. The writer's answer is
//! untrusted, so it goes through an ordered list of extraction strategies
//! and the first one that recognizes the output wins:
//!
//! 1. a structured object with a `markdown_report` field
//! 2. a JSON-looking fragment embedding `"markdown_report": "..."`
//! 3. freeform text that is already a markdown document with headings
//! 4. any other non-empty text, taken verbatim
//!
//! When nothing matches a fixed "no content" report is returned. Timeouts
//! and hard failures also produce a well-formed report. Every report leaves
//! through the reference normalizer.

use crate::llm::generation::excerpt;
use crate::llm::{Agent, GenerationOutcome};
use crate::research::artifacts::ArtifactStore;
use crate::research::references;
use crate::types::{
    AppError, Citation, ReportRecord, ResearchCategory, SearchOutcome, SearchSource,
    DEFAULT_METHODOLOGY,
};
use crate::utils::toml_config::{SynthesisBudget, SynthesisConfig};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;

static EMBEDDED_REPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""markdown_report"\s*:\s*"((?:[^"\\]|\\.)*)""#).unwrap());

static EMBEDDED_SUMMARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""short_summary"\s*:\s*"((?:[^"\\]|\\.)*)""#).unwrap());

/// Characters of body text used when a summary must be synthesized.
pub const SUMMARY_EXCERPT_CHARS: usize = 150;

/// Writer input assembled from successful search outcomes.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisContext {
    pub document: String,
    /// Deduplicated by URL, numbered from 1 in document order
    pub citations: Vec<Citation>,
    pub results_used: usize,
}

/// Build the writer input. Failed outcomes are left out, and the budget caps
/// both the number of results and each summary's length.
pub fn build_context(
    query: &str,
    outcomes: &[SearchOutcome],
    budget: SynthesisBudget,
) -> SynthesisContext {
    let mut web_section = String::new();
    let mut file_section = String::new();
    let mut citations: Vec<Citation> = Vec::new();
    let mut seen_urls = HashSet::new();
    let mut results_used = 0;

    for outcome in outcomes {
        if results_used >= budget.max_results {
            break;
        }
        let SearchOutcome::Success {
            task,
            summary,
            citations: found,
        } = outcome
        else {
            continue;
        };

        let summary = excerpt(summary.trim(), budget.max_summary_chars);
        match &task.source {
            SearchSource::Web => web_section.push_str(&format!(
                "Web search for '{}': {}\n\n",
                task.query, summary
            )),
            SearchSource::File(path) => file_section.push_str(&format!(
                "File search for '{}': {}\n\n",
                path.display(),
                summary
            )),
        }

        for citation in found {
            if seen_urls.insert(citation.url.clone()) {
                citations.push(citation.clone());
            }
        }
        results_used += 1;
    }

    let mut document = format!("Original query: {}\n\n", query);
    if results_used == 0 {
        document.push_str(
            "No search results were available. Write from general knowledge and state this limitation in the report.\n",
        );
    }
    if !web_section.is_empty() {
        document.push_str("Web search results:\n");
        document.push_str(&web_section);
    }
    if !file_section.is_empty() {
        document.push_str("File search results:\n");
        document.push_str(&file_section);
    }
    if !citations.is_empty() {
        document.push_str("Available references (cite as (Reference N)):\n");
        for (idx, citation) in citations.iter().enumerate() {
            document.push_str(&format!("{}. {} - {}\n", idx + 1, citation.title, citation.url));
        }
    }

    SynthesisContext {
        document,
        citations,
        results_used,
    }
}

// ============= Extraction Strategies =============

type ExtractionStrategy = fn(&str, &GenerationOutcome) -> Option<ReportRecord>;

const STRATEGIES: [(&str, ExtractionStrategy); 4] = [
    ("structured", from_structured),
    ("embedded_json", from_embedded_json),
    ("markdown_document", from_markdown_document),
    ("raw_text", from_raw_text),
];

/// Normalize any generation outcome into a report. Never fails.
pub fn extract_report(query: &str, outcome: &GenerationOutcome) -> ReportRecord {
    STRATEGIES
        .iter()
        .find_map(|(name, strategy)| {
            strategy(query, outcome).inspect(|_| {
                tracing::debug!(strategy = *name, "Report extracted");
            })
        })
        .unwrap_or_else(|| no_content_report(query))
}

/// Like [`extract_report`], but `None` when the outcome carries no usable
/// report at all.
pub fn try_extract_report(query: &str, outcome: &GenerationOutcome) -> Option<ReportRecord> {
    STRATEGIES
        .iter()
        .find_map(|(_, strategy)| strategy(query, outcome))
}

fn outcome_text(outcome: &GenerationOutcome) -> Option<String> {
    outcome.raw_text().filter(|text| !text.trim().is_empty())
}

fn from_structured(_query: &str, outcome: &GenerationOutcome) -> Option<ReportRecord> {
    let GenerationOutcome::Structured { value, .. } = outcome else {
        return None;
    };
    let mut report: ReportRecord = serde_json::from_value(value.clone()).ok()?;
    if report.markdown_report.trim().is_empty() {
        return None;
    }
    if report.short_summary.trim().is_empty() {
        report.short_summary = summary_from_body(&report.markdown_report);
    }
    if report.methodological_approach.trim().is_empty() {
        report.methodological_approach = DEFAULT_METHODOLOGY.to_string();
    }
    Some(report)
}

/// Decode a JSON string body captured without its quotes.
fn unescape_json_string(raw: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{}\"", raw))
        .unwrap_or_else(|_| raw.replace("\\n", "\n").replace("\\\"", "\""))
}

fn capture_field(pattern: &Regex, text: &str) -> Option<String> {
    let raw = pattern.captures(text)?.get(1)?.as_str();
    Some(unescape_json_string(raw))
}

fn from_embedded_json(_query: &str, outcome: &GenerationOutcome) -> Option<ReportRecord> {
    let text = outcome_text(outcome)?;
    let body = capture_field(&EMBEDDED_REPORT, &text)?;
    if body.trim().is_empty() {
        return None;
    }
    let summary = capture_field(&EMBEDDED_SUMMARY, &text)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| summary_from_body(&body));
    Some(ReportRecord::new(summary, body))
}

fn looks_like_markdown_document(text: &str) -> bool {
    let mut top_level = false;
    let mut sub_heading = false;
    for line in text.lines() {
        let line = line.trim_start();
        if line.starts_with("# ") {
            top_level = true;
        } else if line.starts_with("## ") {
            sub_heading = true;
        }
    }
    top_level && sub_heading
}

fn from_markdown_document(_query: &str, outcome: &GenerationOutcome) -> Option<ReportRecord> {
    let GenerationOutcome::RawText(text) = outcome else {
        return None;
    };
    if !looks_like_markdown_document(text) {
        return None;
    }
    let body = text.trim();
    Some(ReportRecord::new(summary_from_body(body), body))
}

fn from_raw_text(_query: &str, outcome: &GenerationOutcome) -> Option<ReportRecord> {
    let text = outcome_text(outcome)?;
    let body = text.trim();
    let mut report = ReportRecord::new(excerpt(body, SUMMARY_EXCERPT_CHARS), body);
    report.follow_up_questions = vec!["What follow-up research would be valuable?".to_string()];
    report.key_insights = vec!["Extracted from raw response".to_string()];
    report.information_gaps = vec!["Structured parsing failed".to_string()];
    Some(report)
}

/// Summary from the first prose paragraph of a markdown body.
fn summary_from_body(body: &str) -> String {
    let paragraph = body
        .split("\n\n")
        .map(str::trim)
        .find(|p| !p.is_empty() && !p.starts_with('#') && !p.starts_with("*Generated"))
        .unwrap_or(body.trim());
    excerpt(paragraph, SUMMARY_EXCERPT_CHARS)
}

// ============= Degraded Reports =============

pub fn no_content_report(query: &str) -> ReportRecord {
    let mut report = ReportRecord::new(
        format!("No report content was generated for: {}", query),
        format!(
            "# Research Report on {}\n\nUnable to extract full report content.",
            query
        ),
    );
    report.follow_up_questions = vec!["How can we improve this research?".to_string()];
    report.key_insights = vec!["Error occurred during report extraction".to_string()];
    report.information_gaps = vec!["Complete report could not be extracted".to_string()];
    report
}

fn findings_digest(context: &SynthesisContext) -> String {
    if context.citations.is_empty() {
        return String::new();
    }
    let mut digest = String::from("\n\n## Sources Gathered\n\n");
    for (idx, citation) in context.citations.iter().enumerate() {
        digest.push_str(&format!("{}. {} - {}\n", idx + 1, citation.title, citation.url));
    }
    digest
}

pub fn timeout_report(query: &str, deadline: Duration, context: &SynthesisContext) -> ReportRecord {
    let mut report = ReportRecord::new(
        format!("Report generation for '{}' timed out", query),
        format!(
            "# Research Report on {}\n\nReport generation timed out after {} seconds. {} search results were gathered but could not be synthesized in time.{}",
            query,
            deadline.as_secs_f64(),
            context.results_used,
            findings_digest(context)
        ),
    );
    report.information_gaps = vec![format!(
        "Report generation timed out after {} seconds; the synthesis is incomplete",
        deadline.as_secs_f64()
    )];
    report.follow_up_questions = vec!["Rerun the research with a longer synthesis timeout".to_string()];
    report
}

pub fn error_report(query: &str, err: &AppError, context: &SynthesisContext) -> ReportRecord {
    let mut report = ReportRecord::new(
        format!("Report generation for '{}' failed", query),
        format!(
            "# Research Report on {}\n\nReport generation failed: {}{}",
            query,
            err,
            findings_digest(context)
        ),
    );
    report.information_gaps = vec![format!("Report generation failed: {}", err)];
    report
}

/// Set the citation count: the extracted citation set when there is one,
/// otherwise the model's own count or the distinct inline markers.
pub fn apply_citation_count(mut report: ReportRecord, extracted_citations: usize) -> ReportRecord {
    report.citation_count = if extracted_citations > 0 {
        extracted_citations
    } else if report.citation_count > 0 {
        report.citation_count
    } else {
        references::distinct_markers(&report.markdown_report)
    };
    report
}

// ============= Synthesizer =============

pub struct ReportSynthesizer {
    config: SynthesisConfig,
    artifacts: ArtifactStore,
    timeout: Duration,
}

impl ReportSynthesizer {
    pub fn new(config: SynthesisConfig, artifacts: ArtifactStore) -> Self {
        let timeout = Duration::from_secs(config.timeout_secs);
        Self {
            config,
            artifacts,
            timeout,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Write a report for the query from the search outcomes.
    ///
    /// Returns the normalized report and the number of deduplicated
    /// citations handed to the writer.
    pub async fn synthesize(
        &self,
        query: &str,
        category: ResearchCategory,
        outcomes: &[SearchOutcome],
        writer: &Agent,
    ) -> (ReportRecord, usize) {
        let budget = self.config.budget_for(writer.profile.tier);
        let context = build_context(query, outcomes, budget);
        tracing::info!(
            %category,
            writer = writer.name(),
            results = context.results_used,
            citations = context.citations.len(),
            "Synthesizing report"
        );

        let deadline = self.timeout();
        let outcome = writer.invoke(&context.document, deadline).await;

        if let Some(raw) = outcome.raw_text() {
            self.artifacts.save_raw("writer", &raw).await;
        }

        let report = match &outcome {
            GenerationOutcome::Failed(AppError::Timeout(_)) => {
                tracing::warn!("Report generation timed out after {:?}", deadline);
                timeout_report(query, deadline, &context)
            }
            GenerationOutcome::Failed(err) => {
                tracing::warn!("Report generation failed: {}", err);
                error_report(query, err, &context)
            }
            _ => extract_report(query, &outcome),
        };

        let extracted = context.citations.len();
        let report = apply_citation_count(references::normalize(report), extracted);
        (report, extracted)
    }
}
