//! TOML-based configuration for Vidya
//!
//! This module provides declarative configuration for providers, models,
//! agents and every tunable of the research pipeline via a TOML file
//! (`vidya.toml`). All sections are optional; a missing file yields the
//! built-in local Ollama setup.

use crate::types::{AppError, ModelTier};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "vidya.toml";

/// Agent names accepted in `[agents.*]`.
pub const AGENT_NAMES: [&str; 8] = [
    "router",
    "planner",
    "search",
    "scientific",
    "technical",
    "humanities",
    "interdisciplinary",
    "evaluator",
];

/// Root configuration structure loaded from vidya.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VidyaConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Named LLM provider configurations
    #[serde(default = "default_providers")]
    pub providers: HashMap<String, ProviderConfig>,

    /// Named model configurations that reference providers
    #[serde(default = "default_models")]
    pub models: HashMap<String, ModelConfig>,

    /// Model used by agents without an `[agents.*]` entry
    #[serde(default = "default_model_name")]
    pub default_model: String,

    /// Per-agent overrides
    #[serde(default)]
    pub agents: HashMap<String, AgentConfig>,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub synthesis: SynthesisConfig,

    #[serde(default)]
    pub refinement: RefinementConfig,

    #[serde(default)]
    pub artifacts: ArtifactsConfig,
}

impl Default for VidyaConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            providers: default_providers(),
            models: default_models(),
            default_model: default_model_name(),
            agents: HashMap::new(),
            pipeline: PipelineConfig::default(),
            search: SearchConfig::default(),
            synthesis: SynthesisConfig::default(),
            refinement: RefinementConfig::default(),
            artifacts: ArtifactsConfig::default(),
        }
    }
}

// ============= Logging Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ============= Provider Configuration =============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
        default_model: String,
    },
    OpenAI {
        /// Environment variable holding the API key
        api_key_env: String,
        #[serde(default = "default_openai_base")]
        api_base: String,
        default_model: String,
    },
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_providers() -> HashMap<String, ProviderConfig> {
    HashMap::from([(
        "ollama-local".to_string(),
        ProviderConfig::Ollama {
            base_url: default_ollama_url(),
            default_model: "llama3.2".to_string(),
        },
    )])
}

// ============= Model Configuration =============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Provider name from `[providers.*]`
    pub provider: String,

    /// Model identifier passed to the provider
    pub model: String,

    /// Context-size class, selects the synthesis budget. Unset keeps the
    /// role's built-in tier.
    #[serde(default)]
    pub tier: Option<ModelTier>,
}

fn default_model_name() -> String {
    "default".to_string()
}

fn default_models() -> HashMap<String, ModelConfig> {
    HashMap::from([(
        default_model_name(),
        ModelConfig {
            provider: "ollama-local".to_string(),
            model: "llama3.2".to_string(),
            tier: None,
        },
    )])
}

// ============= Agent Configuration =============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Model name from `[models.*]`
    pub model: String,

    /// Replaces the built-in instructions
    #[serde(default)]
    pub system_prompt: Option<String>,
}

// ============= Pipeline Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_routing_timeout")]
    pub routing_timeout_secs: u64,

    #[serde(default = "default_planning_timeout")]
    pub planning_timeout_secs: u64,
}

fn default_routing_timeout() -> u64 {
    60
}

fn default_planning_timeout() -> u64 {
    120
}

impl PipelineConfig {
    pub fn routing_timeout(&self) -> Duration {
        Duration::from_secs(self.routing_timeout_secs)
    }

    pub fn planning_timeout(&self) -> Duration {
        Duration::from_secs(self.planning_timeout_secs)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            routing_timeout_secs: default_routing_timeout(),
            planning_timeout_secs: default_planning_timeout(),
        }
    }
}

// ============= Search Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Tasks run in parallel per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_task_timeout")]
    pub task_timeout_secs: u64,

    #[serde(default = "default_batch_timeout")]
    pub batch_timeout_secs: u64,

    /// Pause between batches, not counted against any timeout
    #[serde(default = "default_inter_batch_delay")]
    pub inter_batch_delay_ms: u64,

    /// Upper bound on planned searches
    #[serde(default = "default_max_tasks")]
    pub max_tasks: usize,

    /// Web results requested per query
    #[serde(default = "default_results_per_query")]
    pub results_per_query: usize,

    /// Characters read from the start of each searched file
    #[serde(default = "default_file_excerpt_chars")]
    pub file_excerpt_chars: usize,
}

fn default_batch_size() -> usize {
    3
}

fn default_task_timeout() -> u64 {
    120
}

fn default_batch_timeout() -> u64 {
    180
}

fn default_inter_batch_delay() -> u64 {
    1000
}

fn default_max_tasks() -> usize {
    20
}

fn default_results_per_query() -> usize {
    5
}

fn default_file_excerpt_chars() -> usize {
    2000
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            task_timeout_secs: default_task_timeout(),
            batch_timeout_secs: default_batch_timeout(),
            inter_batch_delay_ms: default_inter_batch_delay(),
            max_tasks: default_max_tasks(),
            results_per_query: default_results_per_query(),
            file_excerpt_chars: default_file_excerpt_chars(),
        }
    }
}

// ============= Synthesis Configuration =============

/// Caps on what the writer sees from the search stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisBudget {
    pub max_results: usize,
    pub max_summary_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    #[serde(default = "default_synthesis_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_small_budget")]
    pub small: SynthesisBudget,

    #[serde(default = "default_large_budget")]
    pub large: SynthesisBudget,
}

fn default_synthesis_timeout() -> u64 {
    300
}

fn default_small_budget() -> SynthesisBudget {
    SynthesisBudget {
        max_results: 5,
        max_summary_chars: 800,
    }
}

fn default_large_budget() -> SynthesisBudget {
    SynthesisBudget {
        max_results: 8,
        max_summary_chars: 1500,
    }
}

impl SynthesisConfig {
    pub fn budget_for(&self, tier: ModelTier) -> SynthesisBudget {
        match tier {
            ModelTier::Small => self.small,
            ModelTier::Large => self.large,
        }
    }
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_synthesis_timeout(),
            small: default_small_budget(),
            large: default_large_budget(),
        }
    }
}

// ============= Refinement Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinementConfig {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Score on a 0-10 scale at which a report is accepted
    #[serde(default = "default_min_score")]
    pub min_score: f64,

    #[serde(default = "default_evaluator_timeout")]
    pub evaluator_timeout_secs: u64,

    #[serde(default = "default_refiner_timeout")]
    pub refiner_timeout_secs: u64,
}

fn default_max_iterations() -> usize {
    2
}

fn default_min_score() -> f64 {
    8.5
}

fn default_evaluator_timeout() -> u64 {
    120
}

fn default_refiner_timeout() -> u64 {
    300
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            min_score: default_min_score(),
            evaluator_timeout_secs: default_evaluator_timeout(),
            refiner_timeout_secs: default_refiner_timeout(),
        }
    }
}

// ============= Artifact Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactsConfig {
    /// Write raw generation snapshots next to the final report
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_artifact_dir")]
    pub dir: PathBuf,
}

fn default_true() -> bool {
    true
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("./research_outputs")
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: default_artifact_dir(),
        }
    }
}

// ============= Errors =============

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),

    #[error("Provider '{0}' referenced by model '{1}' does not exist")]
    MissingProvider(String, String),

    #[error("Model '{0}' referenced by '{1}' does not exist")]
    MissingModel(String, String),

    #[error("Unknown agent '{0}' (expected one of: {1})")]
    UnknownAgent(String, String),
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

impl VidyaConfig {
    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Load from an explicit path, or from `vidya.toml` when present,
    /// falling back to built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load(default_path)
                } else {
                    tracing::debug!("No {} found, using built-in defaults", DEFAULT_CONFIG_FILE);
                    let config = Self::default();
                    config.validate()?;
                    Ok(config)
                }
            }
        }
    }

    /// Parse and validate configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: VidyaConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for internal consistency and env var availability
    pub fn validate(&self) -> Result<(), ConfigError> {
        for provider in self.providers.values() {
            if let ProviderConfig::OpenAI { api_key_env, .. } = provider {
                self.validate_env_var(api_key_env)?;
            }
        }

        for (model_name, model_config) in &self.models {
            if !self.providers.contains_key(&model_config.provider) {
                return Err(ConfigError::MissingProvider(
                    model_config.provider.clone(),
                    model_name.clone(),
                ));
            }
        }

        if !self.models.contains_key(&self.default_model) {
            return Err(ConfigError::MissingModel(
                self.default_model.clone(),
                "default_model".to_string(),
            ));
        }

        for (agent_name, agent_config) in &self.agents {
            if !AGENT_NAMES.contains(&agent_name.as_str()) {
                return Err(ConfigError::UnknownAgent(
                    agent_name.clone(),
                    AGENT_NAMES.join(", "),
                ));
            }
            if !self.models.contains_key(&agent_config.model) {
                return Err(ConfigError::MissingModel(
                    agent_config.model.clone(),
                    format!("agent '{}'", agent_name),
                ));
            }
        }

        if self.search.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "search.batch_size must be greater than 0".to_string(),
            ));
        }
        if self.search.max_tasks == 0 {
            return Err(ConfigError::ValidationError(
                "search.max_tasks must be greater than 0".to_string(),
            ));
        }
        if self.search.task_timeout_secs == 0 || self.search.batch_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "search timeouts must be greater than 0".to_string(),
            ));
        }
        for (name, budget) in [("small", self.synthesis.small), ("large", self.synthesis.large)] {
            if budget.max_results == 0 || budget.max_summary_chars == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "synthesis.{} budget must allow at least one result and one character",
                    name
                )));
            }
        }
        validate_max_iterations(self.refinement.max_iterations)?;
        validate_min_score(self.refinement.min_score)?;

        Ok(())
    }

    fn validate_env_var(&self, name: &str) -> Result<(), ConfigError> {
        std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))?;
        Ok(())
    }

    /// Get a resolved value from an env var reference
    pub fn resolve_env(&self, env_name: &str) -> Option<String> {
        std::env::var(env_name).ok()
    }

    /// Get provider by name
    pub fn get_provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name)
    }

    /// Get model by name
    pub fn get_model(&self, name: &str) -> Option<&ModelConfig> {
        self.models.get(name)
    }

    /// Get agent config by name
    pub fn get_agent(&self, name: &str) -> Option<&AgentConfig> {
        self.agents.get(name)
    }

    /// Apply CLI overrides for the quality gate.
    pub fn with_refinement_overrides(
        mut self,
        max_iterations: Option<usize>,
        min_score: Option<f64>,
    ) -> Result<Self, ConfigError> {
        if let Some(max_iterations) = max_iterations {
            validate_max_iterations(max_iterations)?;
            self.refinement.max_iterations = max_iterations;
        }
        if let Some(min_score) = min_score {
            validate_min_score(min_score)?;
            self.refinement.min_score = min_score;
        }
        Ok(self)
    }
}

fn validate_max_iterations(max_iterations: usize) -> Result<(), ConfigError> {
    if max_iterations == 0 {
        return Err(ConfigError::ValidationError(
            "max_iterations must be at least 1".to_string(),
        ));
    }
    Ok(())
}

fn validate_min_score(min_score: f64) -> Result<(), ConfigError> {
    if !(0.0..=10.0).contains(&min_score) {
        return Err(ConfigError::ValidationError(format!(
            "min_score must be between 0 and 10, got {}",
            min_score
        )));
    }
    Ok(())
}
