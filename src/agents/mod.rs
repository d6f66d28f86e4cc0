//! Research agents
//!
//! Every stage of the pipeline talks to the generation capability through an
//! [`AgentProfile`]: a named role with instructions, a model tier and, for
//! structured stages, a JSON output schema.

pub mod evaluator;
pub mod planner;
pub mod prompts;
pub mod registry;
pub mod router;

use crate::types::{Evaluation, ModelTier, ReportRecord, ResearchCategory};
use schemars::JsonSchema;
use serde_json::Value;
use std::fmt;

pub use registry::AgentRegistry;

/// Role an agent plays in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentRole {
    Router,
    Planner,
    Search,
    /// Category-specific report writer, also used for refinement
    Writer(ResearchCategory),
    Evaluator,
}

impl AgentRole {
    /// Key of this role under `[agents.*]`.
    pub fn config_key(&self) -> &'static str {
        match self {
            AgentRole::Router => "router",
            AgentRole::Planner => "planner",
            AgentRole::Search => "search",
            AgentRole::Writer(category) => category.as_str(),
            AgentRole::Evaluator => "evaluator",
        }
    }

    pub fn all() -> Vec<AgentRole> {
        let mut roles = vec![AgentRole::Router, AgentRole::Planner, AgentRole::Search];
        roles.extend(ResearchCategory::ALL.into_iter().map(AgentRole::Writer));
        roles.push(AgentRole::Evaluator);
        roles
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_key())
    }
}

/// Named configuration bound to one generation invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentProfile {
    pub role: AgentRole,
    pub name: String,
    pub instructions: String,
    pub tier: ModelTier,
    /// JSON schema the response must follow, if the stage is structured
    pub output_schema: Option<Value>,
}

impl AgentProfile {
    /// Built-in profile for a role.
    pub fn default_for(role: AgentRole) -> Self {
        let (name, instructions, output_schema) = match role {
            AgentRole::Router => ("RouterAgent", prompts::ROUTER_INSTRUCTIONS.to_string(), None),
            AgentRole::Planner => (
                "PlannerAgent",
                prompts::PLANNER_INSTRUCTIONS.to_string(),
                schema_of::<planner::PlannerOutput>(),
            ),
            AgentRole::Search => ("SearchAgent", prompts::SEARCH_INSTRUCTIONS.to_string(), None),
            AgentRole::Writer(category) => (
                writer_name(category),
                prompts::writer_instructions(category),
                schema_of::<ReportRecord>(),
            ),
            AgentRole::Evaluator => (
                "EvaluatorAgent",
                prompts::EVALUATOR_INSTRUCTIONS.to_string(),
                schema_of::<Evaluation>(),
            ),
        };

        // The technical writer runs on the cheaper model by default.
        let tier = match role {
            AgentRole::Writer(ResearchCategory::Technical) => ModelTier::Small,
            _ => ModelTier::Large,
        };

        Self {
            role,
            name: name.to_string(),
            instructions,
            tier,
            output_schema,
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn with_tier(mut self, tier: ModelTier) -> Self {
        self.tier = tier;
        self
    }

    /// Instructions plus the output contract, sent as the system prompt.
    pub fn system_prompt(&self) -> String {
        match &self.output_schema {
            Some(schema) => format!(
                "{}\n\nRespond ONLY with a JSON object that conforms to this JSON schema:\n{}",
                self.instructions,
                serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string())
            ),
            None => self.instructions.clone(),
        }
    }
}

fn writer_name(category: ResearchCategory) -> &'static str {
    match category {
        ResearchCategory::Scientific => "ScientificResearchAgent",
        ResearchCategory::Technical => "TechnicalResearchAgent",
        ResearchCategory::Humanities => "HumanitiesResearchAgent",
        ResearchCategory::Interdisciplinary => "InterdisciplinaryResearchAgent",
    }
}

fn schema_of<T: JsonSchema>() -> Option<Value> {
    serde_json::to_value(schemars::schema_for!(T)).ok()
}
