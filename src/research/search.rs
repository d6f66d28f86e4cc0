//! Search fan-out executor
//!
//! Runs planned search tasks in sequential batches of parallel searches:
//!
//! 1. Priority tasks are moved to the front, the rest keep their order
//! 2. Each batch runs its tasks concurrently, each under a per-task timeout
//! 3. The whole batch runs under a batch timeout; if it fires, every task in
//!    the batch is recorded as failed
//! 4. Batches are separated by a short pause outside all timeouts
//!
//! Failures never abort the executor: it returns exactly one
//! [`SearchOutcome`] per task. Outcomes are appended in batch order; order
//! within a batch is unspecified.

use crate::research::progress::{ProgressSink, ResearchStage};
use crate::types::{Citation, Result, SearchOutcome, SearchPlan, SearchTask};
use crate::utils::toml_config::SearchConfig;
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;

/// What a successful search produced.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchFindings {
    pub summary: String,
    pub citations: Vec<Citation>,
}

/// A source of search results for one task.
#[async_trait]
pub trait Searcher: Send + Sync {
    async fn search(&self, task: &SearchTask) -> Result<SearchFindings>;
}

/// Failure reason recorded for a task that exceeded its own deadline.
pub const TASK_TIMEOUT_REASON: &str = "timed out";
/// Failure reason recorded for every task of a batch that exceeded its deadline.
pub const BATCH_TIMEOUT_REASON: &str = "chunk timed out";

/// Configuration for search fan-out behavior.
#[derive(Debug, Clone)]
pub struct SearchExecutorConfig {
    /// Tasks executed in parallel per batch.
    pub batch_size: usize,

    /// Deadline for a single search.
    pub task_timeout: Duration,

    /// Deadline for a whole batch.
    pub batch_timeout: Duration,

    /// Pause between consecutive batches.
    pub inter_batch_delay: Duration,
}

impl Default for SearchExecutorConfig {
    fn default() -> Self {
        Self {
            batch_size: 3,
            task_timeout: Duration::from_secs(120),
            batch_timeout: Duration::from_secs(180),
            inter_batch_delay: Duration::from_secs(1),
        }
    }
}

impl From<&SearchConfig> for SearchExecutorConfig {
    fn from(config: &SearchConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            task_timeout: Duration::from_secs(config.task_timeout_secs),
            batch_timeout: Duration::from_secs(config.batch_timeout_secs),
            inter_batch_delay: Duration::from_millis(config.inter_batch_delay_ms),
        }
    }
}

/// Execution order of task indices: valid priority indices first in the
/// order given (each once), then every other index in original order.
pub fn prioritized_order(len: usize, priority: &[usize]) -> Vec<usize> {
    let mut order = Vec::with_capacity(len);
    let mut taken = vec![false; len];

    for &idx in priority {
        if idx < len && !taken[idx] {
            taken[idx] = true;
            order.push(idx);
        }
    }
    for (idx, is_taken) in taken.iter().enumerate() {
        if !is_taken {
            order.push(idx);
        }
    }
    order
}

pub struct SearchExecutor {
    searcher: Arc<dyn Searcher>,
    config: SearchExecutorConfig,
}

impl SearchExecutor {
    pub fn new(searcher: Arc<dyn Searcher>, config: SearchExecutorConfig) -> Self {
        Self { searcher, config }
    }

    /// Execute every task of a plan, honoring its priority indices.
    pub async fn execute(&self, plan: &SearchPlan, progress: &dyn ProgressSink) -> Vec<SearchOutcome> {
        self.execute_tasks(&plan.searches, &plan.priority_indices, progress)
            .await
    }

    pub async fn execute_tasks(
        &self,
        tasks: &[SearchTask],
        priority: &[usize],
        progress: &dyn ProgressSink,
    ) -> Vec<SearchOutcome> {
        let order = prioritized_order(tasks.len(), priority);
        let batch_size = self.config.batch_size.max(1);
        let batch_count = order.len().div_ceil(batch_size);
        let mut outcomes = Vec::with_capacity(tasks.len());
        let start = Instant::now();

        for (batch_idx, batch) in order.chunks(batch_size).enumerate() {
            if batch_idx > 0 && !self.config.inter_batch_delay.is_zero() {
                tokio::time::sleep(self.config.inter_batch_delay).await;
            }

            progress.working(
                ResearchStage::Searching,
                &format!(
                    "Batch {}/{}: {} searches",
                    batch_idx + 1,
                    batch_count,
                    batch.len()
                ),
            );

            let batch_outcomes = self.run_batch(tasks, batch).await;
            let failed = batch_outcomes.iter().filter(|o| !o.is_success()).count();
            tracing::info!(
                "Search batch {}/{} finished: {} ok, {} failed",
                batch_idx + 1,
                batch_count,
                batch_outcomes.len() - failed,
                failed
            );
            outcomes.extend(batch_outcomes);
        }

        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        progress.finished(
            ResearchStage::Searching,
            &format!(
                "{} of {} searches succeeded in {:.1}s",
                succeeded,
                outcomes.len(),
                start.elapsed().as_secs_f64()
            ),
        );
        outcomes
    }

    async fn run_batch(&self, tasks: &[SearchTask], batch: &[usize]) -> Vec<SearchOutcome> {
        let searches = batch.iter().map(|&idx| self.run_task(&tasks[idx]));

        match timeout(self.config.batch_timeout, join_all(searches)).await {
            Ok(outcomes) => outcomes,
            Err(_) => {
                tracing::warn!(
                    "Search batch exceeded {:?}, marking {} tasks failed",
                    self.config.batch_timeout,
                    batch.len()
                );
                batch
                    .iter()
                    .map(|&idx| SearchOutcome::failure(tasks[idx].clone(), BATCH_TIMEOUT_REASON))
                    .collect()
            }
        }
    }

    async fn run_task(&self, task: &SearchTask) -> SearchOutcome {
        match timeout(self.config.task_timeout, self.searcher.search(task)).await {
            Ok(Ok(findings)) => SearchOutcome::Success {
                task: task.clone(),
                summary: findings.summary,
                citations: findings.citations,
            },
            Ok(Err(e)) => {
                tracing::warn!("Search '{}' failed: {}", task.query, e);
                SearchOutcome::failure(task.clone(), e.to_string())
            }
            Err(_) => {
                tracing::warn!(
                    "Search '{}' timed out after {:?}",
                    task.query,
                    self.config.task_timeout
                );
                SearchOutcome::failure(task.clone(), TASK_TIMEOUT_REASON)
            }
        }
    }
}
