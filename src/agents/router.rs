use crate::llm::{Agent, GenerationOutcome};
use crate::types::{AppError, ResearchCategory, Result};
use std::time::Duration;

/// Router that classifies a research query into a [`ResearchCategory`].
///
/// Classification problems never fail a run: anything the router cannot
/// understand routes to [`ResearchCategory::Interdisciplinary`]. Only an
/// unreachable generation service is reported as an error.
pub struct ResearchRouter {
    agent: Agent,
    timeout: Duration,
}

impl ResearchRouter {
    /// Creates a new router around the given agent.
    pub fn new(agent: Agent, timeout: Duration) -> Self {
        Self { agent, timeout }
    }

    /// Parse a category from router output
    ///
    /// This handles various LLM output formats:
    /// - Clean output: "technical"
    /// - With whitespace or casing: "  Technical  "
    /// - With extra text: "This belongs to the scientific category."
    pub fn parse_category(output: &str) -> Option<ResearchCategory> {
        let trimmed = output.trim().to_lowercase();

        // First, try exact match
        if let Some(category) = Self::lookup(&trimmed) {
            return Some(category);
        }

        // Split by common delimiters and check each word
        for word in trimmed.split(|c: char| {
            c.is_whitespace() || matches!(c, ':' | ',' | '.' | '"' | '\'' | '*' | '`')
        }) {
            if let Some(category) = Self::lookup(word.trim()) {
                return Some(category);
            }
        }

        // Check if any category name is contained in the output
        ResearchCategory::ALL
            .into_iter()
            .find(|category| trimmed.contains(category.as_str()))
    }

    fn lookup(word: &str) -> Option<ResearchCategory> {
        ResearchCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == word)
    }

    /// Routes a query to a research category.
    pub async fn route(&self, query: &str) -> Result<ResearchCategory> {
        let outcome = self.agent.invoke(query, self.timeout).await;

        let text = match outcome {
            GenerationOutcome::Failed(err @ AppError::Unavailable(_)) => return Err(err),
            GenerationOutcome::Failed(err) => {
                tracing::warn!("Routing failed ({}), defaulting to interdisciplinary", err);
                return Ok(ResearchCategory::Interdisciplinary);
            }
            GenerationOutcome::Structured { value, .. } => value
                .get("category")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| value.to_string()),
            GenerationOutcome::RawText(text) => text,
        };

        match Self::parse_category(&text) {
            Some(category) => Ok(category),
            None => {
                tracing::debug!(
                    "Router could not parse output '{}', defaulting to interdisciplinary",
                    text
                );
                Ok(ResearchCategory::Interdisciplinary)
            }
        }
    }
}
