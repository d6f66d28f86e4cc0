use crate::agents::prompts;
use crate::llm::Agent;
use crate::types::{SearchPlan, SearchTask};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// One search as the planner model proposes it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PlannedSearch {
    /// Why this search matters for the query
    pub reason: String,
    /// The search term to use
    pub query: String,
}

/// Planner response shape.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PlannerOutput {
    pub searches: Vec<PlannedSearch>,
    /// Indices of the searches to run first
    #[serde(default)]
    pub priority_searches: Vec<i64>,
    /// Topic areas the plan covers
    #[serde(default)]
    pub areas_covered: Vec<String>,
}

impl PlannerOutput {
    /// Turn model output into an executable plan.
    ///
    /// Empty and repeated queries are dropped, the plan is capped at
    /// `max_tasks`, and priority indices are remapped to the surviving tasks.
    /// Returns `None` when nothing usable remains.
    pub fn into_plan(self, max_tasks: usize) -> Option<SearchPlan> {
        let mut seen = HashSet::new();
        let mut index_map = HashMap::new();
        let mut searches = Vec::new();

        for (original_idx, planned) in self.searches.into_iter().enumerate() {
            if searches.len() >= max_tasks {
                break;
            }
            let query = planned.query.trim();
            if query.is_empty() || !seen.insert(query.to_lowercase()) {
                continue;
            }
            index_map.insert(original_idx, searches.len());
            searches.push(SearchTask::web(planned.reason.trim(), query));
        }

        if searches.is_empty() {
            return None;
        }

        let mut priority_indices = Vec::new();
        for idx in self.priority_searches {
            let mapped = usize::try_from(idx)
                .ok()
                .and_then(|idx| index_map.get(&idx).copied());
            if let Some(mapped) = mapped {
                if !priority_indices.contains(&mapped) {
                    priority_indices.push(mapped);
                }
            }
        }

        Some(SearchPlan {
            searches,
            priority_indices,
            coverage_areas: self.areas_covered,
        })
    }
}

/// Produces the search plan for a query, falling back to a single search for
/// the raw query whenever the planner fails or answers with nothing usable.
pub struct SearchPlanner {
    agent: Agent,
    timeout: Duration,
    max_tasks: usize,
}

impl SearchPlanner {
    pub fn new(agent: Agent, timeout: Duration, max_tasks: usize) -> Self {
        Self {
            agent,
            timeout,
            max_tasks,
        }
    }

    pub async fn plan(&self, query: &str) -> SearchPlan {
        let outcome = self
            .agent
            .invoke(&prompts::planner_input(query), self.timeout)
            .await;

        let output = match outcome.parse::<PlannerOutput>() {
            Ok(output) => output,
            Err(err) => {
                tracing::warn!("Planning failed ({}), using single-search fallback plan", err);
                return SearchPlan::fallback(query);
            }
        };

        match output.into_plan(self.max_tasks) {
            Some(plan) => {
                tracing::info!(
                    searches = plan.searches.len(),
                    priority = plan.priority_indices.len(),
                    "Search plan ready"
                );
                plan
            }
            None => {
                tracing::warn!("Planner returned no usable searches, using fallback plan");
                SearchPlan::fallback(query)
            }
        }
    }
}
