//! Agent Registry
//!
//! Builds one [`Agent`] per pipeline role from `vidya.toml`:
//!
//! 1. `[agents.<role>]` picks the model and may replace the instructions
//! 2. roles without an entry use `default_model` and built-in instructions
//!
//! Clients are created once per model and shared between roles.

use crate::agents::{AgentProfile, AgentRole};
use crate::llm::{Agent, LLMClient, Provider};
use crate::types::{AppError, Result};
use crate::utils::toml_config::{ConfigError, ProviderConfig, VidyaConfig};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of the agents a research run uses, keyed by role.
#[derive(Debug, Clone)]
pub struct AgentRegistry {
    agents: HashMap<AgentRole, Agent>,
}

impl AgentRegistry {
    /// Every role on the same client with built-in profiles.
    pub fn with_client(client: Arc<dyn LLMClient>) -> Self {
        let agents = AgentRole::all()
            .into_iter()
            .map(|role| (role, Agent::new(AgentProfile::default_for(role), client.clone())))
            .collect();
        Self { agents }
    }

    /// Create the registry from TOML configuration
    pub async fn from_config(config: &VidyaConfig) -> Result<Self> {
        let mut clients: HashMap<String, Arc<dyn LLMClient>> = HashMap::new();
        let mut agents = HashMap::new();

        for role in AgentRole::all() {
            let agent_config = config.get_agent(role.config_key());
            let model_name = agent_config
                .map(|a| a.model.as_str())
                .unwrap_or(config.default_model.as_str());

            let client = match clients.get(model_name) {
                Some(client) => client.clone(),
                None => {
                    let provider = resolve_provider(config, model_name)?;
                    tracing::debug!(
                        model = model_name,
                        provider = provider.name(),
                        "Creating LLM client"
                    );
                    let client: Arc<dyn LLMClient> = Arc::from(provider.create_client().await?);
                    clients.insert(model_name.to_string(), client.clone());
                    client
                }
            };

            let mut profile = AgentProfile::default_for(role);
            if let Some(tier) = config.get_model(model_name).and_then(|model| model.tier) {
                profile = profile.with_tier(tier);
            }
            if let Some(prompt) = agent_config.and_then(|a| a.system_prompt.as_ref()) {
                profile = profile.with_instructions(prompt.clone());
            }

            agents.insert(role, Agent::new(profile, client));
        }

        Ok(Self { agents })
    }

    /// Replace the client behind one role, keeping its profile.
    pub fn with_agent_client(mut self, role: AgentRole, client: Arc<dyn LLMClient>) -> Self {
        let profile = self
            .agents
            .get(&role)
            .map(|agent| agent.profile.clone())
            .unwrap_or_else(|| AgentProfile::default_for(role));
        self.agents.insert(role, Agent::new(profile, client));
        self
    }

    /// Get the agent for a role
    pub fn agent(&self, role: AgentRole) -> Result<&Agent> {
        self.agents
            .get(&role)
            .ok_or_else(|| AppError::Configuration(format!("No agent registered for role '{}'", role)))
    }
}

/// Build the provider for a model name from configuration.
pub fn resolve_provider(config: &VidyaConfig, model_name: &str) -> Result<Provider> {
    let model = config
        .get_model(model_name)
        .ok_or_else(|| ConfigError::MissingModel(model_name.to_string(), "agent".to_string()))?;
    let provider = config.get_provider(&model.provider).ok_or_else(|| {
        ConfigError::MissingProvider(model.provider.clone(), model_name.to_string())
    })?;

    match provider {
        ProviderConfig::Ollama { base_url, .. } => Ok(Provider::Ollama {
            base_url: base_url.clone(),
            model: model.model.clone(),
        }),
        ProviderConfig::OpenAI {
            api_key_env,
            api_base,
            ..
        } => {
            let api_key = config
                .resolve_env(api_key_env)
                .ok_or_else(|| ConfigError::MissingEnvVar(api_key_env.clone()))?;
            Ok(Provider::OpenAI {
                api_key,
                api_base: api_base.clone(),
                model: model.model.clone(),
            })
        }
    }
}
