//! # vidya - multi-agent research pipeline
//!
//! Takes a research question and produces a cited markdown report:
//!
//! 1. **Route** the query to a research category
//! 2. **Plan** a set of web and file searches
//! 3. **Search** in timeout-bounded parallel batches
//! 4. **Write** the report with the category's writer agent
//! 5. **Refine** it through an evaluate/improve quality gate
//!
//! Generation output is treated as untrusted: every stage has a typed
//! fallback, and only an unreachable generation service fails a run.
//!
//! ## Library Usage
//!
//! ```rust,ignore
//! use vidya::{AgentRegistry, ResearchPipeline, VidyaConfig};
//! use vidya::research::progress::TracingProgress;
//!
//! #[tokio::main]
//! async fn main() -> vidya::Result<()> {
//!     let config = VidyaConfig::load_or_default(None)?;
//!     let registry = AgentRegistry::from_config(&config).await?;
//!     let pipeline = ResearchPipeline::from_config(registry, config)?;
//!
//!     let run = pipeline
//!         .run("How do solid-state batteries work?", &TracingProgress)
//!         .await?;
//!     println!("{}", run.report.markdown_report);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ollama` | Ollama local inference (default) |
//! | `openai` | OpenAI-compatible API support |
//!
//! ## Modules
//!
//! - [`agents`] - Agent profiles, prompts, router, planner and evaluator
//! - [`llm`] - LLM client implementations and the agent invocation wrapper
//! - [`research`] - Search fan-out, synthesis, refinement and the pipeline
//! - [`cli`] - Command-line parsing and terminal output
//! - [`types`] - Common types and error handling
//! - [`utils`] - TOML configuration

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// Agent profiles, prompts and the agents built on them.
pub mod agents;
/// Command-line interface.
pub mod cli;
/// LLM provider clients and abstractions.
pub mod llm;
/// Research orchestration.
pub mod research;
/// Core types and errors.
pub mod types;
/// Configuration utilities.
pub mod utils;

// Re-export commonly used types
pub use agents::AgentRegistry;
pub use llm::{Agent, GenerationOutcome, LLMClient, Provider};
pub use research::pipeline::{ResearchPipeline, ResearchRun};
pub use types::{AppError, ReportRecord, ResearchCategory, Result};
pub use utils::toml_config::{ConfigError, VidyaConfig};
