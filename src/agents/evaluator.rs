use crate::agents::prompts;
use crate::llm::Agent;
use crate::types::{Evaluation, ReportRecord, ResearchCategory, Result};
use std::time::Duration;

/// Scores reports against the research standards rubric.
pub struct ReportEvaluator {
    agent: Agent,
    timeout: Duration,
}

impl ReportEvaluator {
    pub fn new(agent: Agent, timeout: Duration) -> Self {
        Self { agent, timeout }
    }

    /// Evaluate a report.
    ///
    /// Timeouts and unparseable verdicts yield a zero-score evaluation so the
    /// refinement loop keeps going; any other failure is returned.
    pub async fn evaluate(
        &self,
        query: &str,
        category: ResearchCategory,
        report: &ReportRecord,
    ) -> Result<Evaluation> {
        let input = prompts::evaluation_input(query, category, report);
        let outcome = self.agent.invoke(&input, self.timeout).await;

        match outcome.parse::<Evaluation>() {
            Ok(evaluation) => Ok(evaluation.clamped()),
            Err(err) if err.is_recoverable() => {
                tracing::warn!("Evaluation unusable ({}), scoring as 0", err);
                Ok(Self::fallback(&err.to_string()))
            }
            Err(err) => Err(err),
        }
    }

    fn fallback(reason: &str) -> Evaluation {
        Evaluation {
            overall_score: 0.0,
            meets_standards: false,
            detailed_feedback: format!("Evaluation unavailable: {}", reason),
            improvement_suggestions: vec![
                "Strengthen structure, sourcing and depth of analysis".to_string(),
            ],
            ..Default::default()
        }
    }
}
