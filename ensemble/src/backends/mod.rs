//! Backend adapters: one module per SDK family, plus the factory that picks
//! the right adapter for an [`AgentConfig`].

pub mod anthropic;
mod chat;
pub mod ollama;
pub mod openai;

pub use anthropic::AnthropicAgent;
pub use ollama::OllamaAgent;
pub use openai::{run_group_chat, OpenAiAgent};

use std::sync::Arc;

use crate::agent::{Agent, Backend};
use crate::config::AgentConfig;
use crate::error::EnsembleError;
use crate::tools::ToolRegistry;

/// Instantiate the adapter for `config`, injecting the tools it declares.
///
/// API keys are resolved here, at construction, so a missing key is a typed
/// configuration error instead of a mid-run surprise.
pub fn create_agent(
    config: AgentConfig,
    registry: &ToolRegistry,
) -> Result<Arc<dyn Agent>, EnsembleError> {
    config.validate()?;
    let tools = registry.resolve(&config.tools)?;

    match config.backend {
        Backend::OpenAi => {
            let key = require_api_key(&config, "OPENAI_API_KEY")?;
            Ok(Arc::new(OpenAiAgent::new(config, key, tools)))
        }
        Backend::Anthropic => {
            let key = require_api_key(&config, "ANTHROPIC_API_KEY")?;
            Ok(Arc::new(AnthropicAgent::new(config, key, tools)))
        }
        Backend::Ollama => Ok(Arc::new(OllamaAgent::new(config, tools))),
    }
}

fn require_api_key(config: &AgentConfig, default_env: &str) -> Result<String, EnsembleError> {
    let env_var = config.llm.api_key_env.as_deref().unwrap_or(default_env);
    std::env::var(env_var).map_err(|_| {
        EnsembleError::Config(format!(
            "agent '{}': environment variable {} is not set",
            config.name, env_var
        ))
    })
}
