//! Quality gate and refinement loop
//!
//! The only cycle in a run: evaluate the current report, stop if it clears
//! the bar, otherwise ask the category writer for an improved version and
//! evaluate again. The loop is bounded by `max_iterations` evaluations.
//!
//! The current report and the best-scoring report are tracked separately.
//! Clearing the bar returns the current report; running out of iterations
//! returns the best one. Nothing in here fails the run.

use crate::agents::evaluator::ReportEvaluator;
use crate::agents::prompts;
use crate::llm::{Agent, GenerationOutcome};
use crate::research::artifacts::ArtifactStore;
use crate::research::progress::{ProgressSink, ResearchStage};
use crate::research::references;
use crate::research::synthesis::{apply_citation_count, try_extract_report};
use crate::types::{
    AppError, Evaluation, RefinementEntry, ReportRecord, ResearchCategory,
};
use crate::utils::toml_config::RefinementConfig;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefinementState {
    Evaluating,
    Refining,
    /// The current report met the bar
    Satisfied,
    /// Iterations ran out; the best report was kept
    Exhausted,
    /// A hard evaluator or writer error ended the loop early
    Aborted,
}

impl fmt::Display for RefinementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RefinementState::Evaluating => "evaluating",
            RefinementState::Refining => "refining",
            RefinementState::Satisfied => "satisfied",
            RefinementState::Exhausted => "exhausted",
            RefinementState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefinementResult {
    pub report: ReportRecord,
    pub best_score: f64,
    pub history: Vec<RefinementEntry>,
    pub final_state: RefinementState,
}

/// Whether an evaluation clears the quality bar.
pub fn is_satisfied(evaluation: &Evaluation, min_score: f64) -> bool {
    evaluation.meets_standards || evaluation.overall_score >= min_score
}

enum RefineStep {
    Improved(ReportRecord),
    Unchanged,
    Failed(AppError),
}

pub struct RefinementLoop {
    evaluator: ReportEvaluator,
    writer: Agent,
    max_iterations: usize,
    min_score: f64,
    refiner_timeout: Duration,
    artifacts: ArtifactStore,
    extracted_citations: usize,
}

impl RefinementLoop {
    pub fn new(evaluator: ReportEvaluator, writer: Agent, config: &RefinementConfig) -> Self {
        Self {
            evaluator,
            writer,
            max_iterations: config.max_iterations,
            min_score: config.min_score,
            refiner_timeout: Duration::from_secs(config.refiner_timeout_secs),
            artifacts: ArtifactStore::disabled(),
            extracted_citations: 0,
        }
    }

    pub fn with_refiner_timeout(mut self, timeout: Duration) -> Self {
        self.refiner_timeout = timeout;
        self
    }

    pub fn with_artifacts(mut self, artifacts: ArtifactStore) -> Self {
        self.artifacts = artifacts;
        self
    }

    /// Size of the citation set gathered during search, carried onto
    /// refined reports.
    pub fn with_extracted_citations(mut self, count: usize) -> Self {
        self.extracted_citations = count;
        self
    }

    pub async fn refine(
        &self,
        query: &str,
        category: ResearchCategory,
        initial: ReportRecord,
        progress: &dyn ProgressSink,
    ) -> RefinementResult {
        let mut current = initial;
        let mut best: Option<(ReportRecord, f64)> = None;
        let mut history = Vec::with_capacity(self.max_iterations);

        for iteration in 1..=self.max_iterations {
            tracing::debug!(iteration, state = %RefinementState::Evaluating, "Refinement step");
            progress.working(
                ResearchStage::Refining,
                &format!("Evaluating report (iteration {}/{})", iteration, self.max_iterations),
            );

            let evaluation = match self.evaluator.evaluate(query, category, &current).await {
                Ok(evaluation) => evaluation,
                Err(err) => {
                    tracing::error!("Evaluator failed, keeping current report: {}", err);
                    return self.aborted(current, best, history, progress);
                }
            };

            let score = evaluation.overall_score;
            history.push(RefinementEntry {
                iteration,
                score,
                feedback: evaluation.feedback().to_string(),
            });
            tracing::info!(iteration, score, "Report evaluated");

            if best.as_ref().is_none_or(|(_, best_score)| score > *best_score) {
                best = Some((current.clone(), score));
            }

            if is_satisfied(&evaluation, self.min_score) {
                progress.finished(
                    ResearchStage::Refining,
                    &format!("Report accepted with score {:.1}", score),
                );
                return RefinementResult {
                    report: current,
                    best_score: score,
                    history,
                    final_state: RefinementState::Satisfied,
                };
            }

            if iteration == self.max_iterations {
                break;
            }

            tracing::debug!(iteration, state = %RefinementState::Refining, "Refinement step");
            progress.working(
                ResearchStage::Refining,
                &format!("Improving report (score {:.1} < {:.1})", score, self.min_score),
            );

            match self.improve(query, &current, &evaluation).await {
                RefineStep::Improved(report) => current = report,
                RefineStep::Unchanged => {}
                RefineStep::Failed(err) => {
                    tracing::error!("Report refinement failed, keeping current report: {}", err);
                    return self.aborted(current, best, history, progress);
                }
            }
        }

        let (report, best_score) = best.unwrap_or((current, 0.0));
        progress.finished(
            ResearchStage::Refining,
            &format!(
                "Iterations exhausted, keeping best report (score {:.1})",
                best_score
            ),
        );
        RefinementResult {
            report,
            best_score,
            history,
            final_state: RefinementState::Exhausted,
        }
    }

    async fn improve(
        &self,
        query: &str,
        current: &ReportRecord,
        evaluation: &Evaluation,
    ) -> RefineStep {
        let input = prompts::refinement_input(query, current, evaluation);
        let outcome = self.writer.invoke(&input, self.refiner_timeout).await;

        if let Some(raw) = outcome.raw_text() {
            self.artifacts.save_raw("refiner", &raw).await;
        }

        match outcome {
            GenerationOutcome::Failed(AppError::Timeout(reason)) => {
                tracing::warn!("Refinement timed out, keeping current report: {}", reason);
                RefineStep::Unchanged
            }
            GenerationOutcome::Failed(err) => RefineStep::Failed(err),
            outcome => match try_extract_report(query, &outcome) {
                Some(report) => RefineStep::Improved(apply_citation_count(
                    references::normalize(report),
                    self.extracted_citations,
                )),
                None => {
                    tracing::warn!("Refinement produced no content, keeping current report");
                    RefineStep::Unchanged
                }
            },
        }
    }

    fn aborted(
        &self,
        current: ReportRecord,
        best: Option<(ReportRecord, f64)>,
        history: Vec<RefinementEntry>,
        progress: &dyn ProgressSink,
    ) -> RefinementResult {
        let best_score = best.map(|(_, score)| score).unwrap_or(0.0);
        progress.finished(ResearchStage::Refining, "Refinement aborted");
        RefinementResult {
            report: current,
            best_score,
            history,
            final_state: RefinementState::Aborted,
        }
    }
}
