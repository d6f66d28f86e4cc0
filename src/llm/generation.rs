//! Agent invocation with a deadline and typed outcome.
//!
//! Model output is untrusted: [`Agent::invoke`] never fails, it reports what
//! came back as a [`GenerationOutcome`] and leaves recovery to the caller.

use crate::agents::AgentProfile;
use crate::llm::LLMClient;
use crate::types::{AppError, Result};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

static JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(\{.*?\})\s*```").unwrap());

/// Result of one generation call.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    /// A JSON object was recovered from the response. `raw` is the response
    /// text it came from.
    Structured { value: Value, raw: String },
    /// Free text, possibly empty.
    RawText(String),
    Failed(AppError),
}

impl GenerationOutcome {
    /// Deserialize a structured outcome into `T`.
    ///
    /// Raw text is given one more chance through JSON recovery before it
    /// counts as a parse failure.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        match self {
            GenerationOutcome::Structured { value, .. } => Ok(serde_json::from_value(value.clone())?),
            GenerationOutcome::RawText(text) => match extract_json(text) {
                Some(value) => Ok(serde_json::from_value(value)?),
                None => Err(AppError::Parse(format!(
                    "Expected JSON output, got: {}",
                    excerpt(text, 120)
                ))),
            },
            GenerationOutcome::Failed(err) => Err(err.clone()),
        }
    }

    /// Text as the model produced it, for diagnostics and artifacts.
    pub fn raw_text(&self) -> Option<String> {
        match self {
            GenerationOutcome::Structured { raw, .. } | GenerationOutcome::RawText(raw) => {
                Some(raw.clone())
            }
            GenerationOutcome::Failed(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, GenerationOutcome::Failed(_))
    }
}

/// An agent profile bound to an LLM client.
#[derive(Clone)]
pub struct Agent {
    pub profile: AgentProfile,
    client: Arc<dyn LLMClient>,
}

impl Agent {
    pub fn new(profile: AgentProfile, client: Arc<dyn LLMClient>) -> Self {
        Self { profile, client }
    }

    pub fn client(&self) -> &Arc<dyn LLMClient> {
        &self.client
    }

    pub fn name(&self) -> &str {
        &self.profile.name
    }

    /// Run the agent on `input` with a hard deadline.
    pub async fn invoke(&self, input: &str, deadline: Duration) -> GenerationOutcome {
        let system = self.profile.system_prompt();
        tracing::debug!(
            agent = %self.profile.name,
            model = %self.client.model_name(),
            input_chars = input.len(),
            "Invoking agent"
        );

        match tokio::time::timeout(deadline, self.client.generate_with_system(&system, input)).await
        {
            Err(_) => GenerationOutcome::Failed(AppError::Timeout(format!(
                "{} did not respond within {}s",
                self.profile.name,
                deadline.as_secs_f64()
            ))),
            Ok(Err(err)) => GenerationOutcome::Failed(err),
            Ok(Ok(text)) => self.classify(text),
        }
    }

    fn classify(&self, text: String) -> GenerationOutcome {
        if self.profile.output_schema.is_none() {
            return GenerationOutcome::RawText(text);
        }
        match extract_json(&text) {
            Some(value) => GenerationOutcome::Structured { value, raw: text },
            None => {
                tracing::debug!(
                    agent = %self.profile.name,
                    "Structured output expected, keeping raw text"
                );
                GenerationOutcome::RawText(text)
            }
        }
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.profile.name)
            .field("model", &self.client.model_name())
            .finish()
    }
}

/// Recover a JSON object from model text: the whole text, a fenced block,
/// or the outermost brace span, in that order.
pub fn extract_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(value) = parse_object(trimmed) {
        return Some(value);
    }

    for captures in JSON_FENCE.captures_iter(trimmed) {
        if let Some(value) = captures.get(1).and_then(|m| parse_object(m.as_str())) {
            return Some(value);
        }
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    parse_object(&trimmed[start..=end])
}

fn parse_object(candidate: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

/// First `max_chars` characters of `text`, on a char boundary.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::AgentRole;
    use crate::types::{Evaluation, ResearchCategory};
    use async_trait::async_trait;

    struct FixedClient {
        response: std::result::Result<String, AppError>,
        delay: Duration,
    }

    #[async_trait]
    impl LLMClient for FixedClient {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.generate_with_system("", prompt).await
        }

        async fn generate_with_system(&self, _system: &str, _prompt: &str) -> Result<String> {
            tokio::time::sleep(self.delay).await;
            self.response.clone()
        }

        fn model_name(&self) -> &str {
            "fixed"
        }
    }

    fn agent(role: AgentRole, response: std::result::Result<&str, AppError>, delay_ms: u64) -> Agent {
        Agent::new(
            AgentProfile::default_for(role),
            Arc::new(FixedClient {
                response: response.map(str::to_string),
                delay: Duration::from_millis(delay_ms),
            }),
        )
    }

    #[test]
    fn test_extract_json_plain() {
        let value = extract_json(r#"{"score": 7}"#).unwrap();
        assert_eq!(value["score"], 7);
    }

    #[test]
    fn test_extract_json_fenced() {
        let text = "Here you go:\n```json\n{\"score\": 8.5, \"feedback\": \"ok\"}\n```\nThanks";
        let value = extract_json(text).unwrap();
        assert_eq!(value["score"], 8.5);
    }

    #[test]
    fn test_extract_json_embedded() {
        let text = "The evaluation is {\"score\": 4, \"nested\": {\"a\": 1}} as requested.";
        let value = extract_json(text).unwrap();
        assert_eq!(value["nested"]["a"], 1);
    }

    #[test]
    fn test_extract_json_rejects_non_objects() {
        assert!(extract_json("[1, 2, 3]").is_none());
        assert!(extract_json("no json here").is_none());
        assert!(extract_json("").is_none());
        assert!(extract_json("} backwards {").is_none());
    }

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        assert_eq!(excerpt("héllo wörld", 5), "héllo...");
        assert_eq!(excerpt("short", 10), "short");
    }

    #[tokio::test]
    async fn test_invoke_structured() {
        let agent = agent(AgentRole::Evaluator, Ok(r#"{"overall_score": 9.1}"#), 0);
        let outcome = agent.invoke("report", Duration::from_secs(1)).await;
        let evaluation: Evaluation = outcome.parse().unwrap();
        assert_eq!(evaluation.overall_score, 9.1);
    }

    #[tokio::test]
    async fn test_structured_outcome_keeps_response_text() {
        let response = "Here is my verdict:\n```json\n{\"overall_score\": 6.0}\n```\nHope it helps.";
        let agent = agent(AgentRole::Evaluator, Ok(response), 0);
        let outcome = agent.invoke("report", Duration::from_secs(1)).await;
        assert!(matches!(outcome, GenerationOutcome::Structured { .. }));
        assert_eq!(outcome.raw_text().as_deref(), Some(response));
    }

    #[tokio::test]
    async fn test_invoke_unstructured_role_keeps_text() {
        let agent = agent(AgentRole::Router, Ok(r#"{"not": "parsed"}"#), 0);
        let outcome = agent.invoke("query", Duration::from_secs(1)).await;
        assert_eq!(outcome, GenerationOutcome::RawText(r#"{"not": "parsed"}"#.to_string()));
    }

    #[tokio::test]
    async fn test_invoke_timeout() {
        let agent = agent(
            AgentRole::Writer(ResearchCategory::Scientific),
            Ok("late"),
            500,
        );
        let outcome = agent.invoke("input", Duration::from_millis(20)).await;
        assert!(matches!(outcome, GenerationOutcome::Failed(AppError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_invoke_hard_error() {
        let agent = agent(
            AgentRole::Planner,
            Err(AppError::LLM("connection reset".to_string())),
            0,
        );
        let outcome = agent.invoke("input", Duration::from_secs(1)).await;
        assert!(outcome.is_failed());
        assert!(matches!(outcome.parse::<Evaluation>(), Err(AppError::LLM(_))));
    }

    #[test]
    fn test_parse_raw_text_without_json_is_parse_error() {
        let outcome = GenerationOutcome::RawText("I cannot comply".to_string());
        assert!(matches!(outcome.parse::<Evaluation>(), Err(AppError::Parse(_))));
    }
}
