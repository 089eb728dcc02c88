use serde::{Deserialize, Serialize};

use crate::agent::Backend;
use crate::error::EnsembleError;

/// How a pipeline distributes a task across its agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Chain outputs: agent N's reply becomes agent N+1's input
    Sequential,
    /// All agents collaborate (native group chat, or broadcast fallback)
    Group,
    /// A supervisor agent routes the task to one specialist
    Supervisor,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Sequential => "sequential",
            Strategy::Group => "group",
            Strategy::Supervisor => "supervisor",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// LLM connection settings for a single agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model name, e.g. "gpt-4o" or "claude-sonnet-4-20250514"
    #[serde(default = "default_model")]
    pub model: String,

    /// Env var holding the API key. Defaults per backend when unset.
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Custom API base URL (Ollama server, OpenAI-compatible proxy, ...)
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_tokens() -> u32 {
    8192
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key_env: None,
            base_url: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Reference to a tool the agent may call, resolved against the registry's
/// built-in set by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    pub name: String,
}

/// Full configuration for a single agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Unique agent name
    pub name: String,

    /// Which SDK powers this agent
    pub backend: Backend,

    /// System prompt / role instructions
    pub instructions: String,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub tools: Vec<ToolConfig>,

    /// Max LLM round-trips per `run` call (tool-use loop bound)
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
}

fn default_max_turns() -> usize {
    10
}

impl AgentConfig {
    pub fn validate(&self) -> Result<(), EnsembleError> {
        if self.name.trim().is_empty() {
            return Err(EnsembleError::Config("agent name must not be empty".into()));
        }
        if self.max_turns == 0 {
            return Err(EnsembleError::Config(format!(
                "agent '{}': max_turns must be at least 1",
                self.name
            )));
        }
        Ok(())
    }
}

/// Configuration for a multi-agent pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,

    /// Ordered list of agent names. Order matters for the sequential strategy
    /// and fixes broadcast concatenation order for the group fallback.
    pub agents: Vec<String>,

    #[serde(default = "default_strategy")]
    pub strategy: Strategy,

    /// Max conversation rounds for the group strategy
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,

    /// Name of the supervisor agent (required for the supervisor strategy)
    #[serde(default)]
    pub supervisor_agent: Option<String>,
}

fn default_strategy() -> Strategy {
    Strategy::Sequential
}

fn default_max_rounds() -> usize {
    10
}

impl PipelineConfig {
    /// Check the invariants the orchestrator relies on.
    ///
    /// Runs once at load/construction time so strategy executors never have to
    /// recover from a malformed config mid-run.
    pub fn validate(&self) -> Result<(), EnsembleError> {
        if self.agents.is_empty() {
            return Err(EnsembleError::Config(format!(
                "pipeline '{}' has no agents",
                self.name
            )));
        }
        if self.max_rounds == 0 {
            return Err(EnsembleError::Config(format!(
                "pipeline '{}': max_rounds must be at least 1",
                self.name
            )));
        }
        if self.strategy == Strategy::Supervisor {
            match &self.supervisor_agent {
                None => {
                    return Err(EnsembleError::Config(format!(
                        "pipeline '{}': supervisor_agent must be set when strategy is 'supervisor'",
                        self.name
                    )));
                }
                Some(sup) if !self.agents.contains(sup) => {
                    return Err(EnsembleError::Config(format!(
                        "pipeline '{}': supervisor_agent '{}' is not in the agents list",
                        self.name, sup
                    )));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

/// Deployment target configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    #[serde(default = "default_target")]
    pub target: DeployTarget,

    /// Port to expose the agent HTTP server
    #[serde(default = "default_port")]
    pub port: u16,

    // Docker
    #[serde(default)]
    pub image_name: Option<String>,

    // Azure
    #[serde(default)]
    pub azure_resource_group: Option<String>,
    #[serde(default = "default_location")]
    pub azure_location: String,
    #[serde(default)]
    pub azure_subscription_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployTarget {
    Local,
    Docker,
    Azure,
}

fn default_target() -> DeployTarget {
    DeployTarget::Local
}

fn default_port() -> u16 {
    8080
}

fn default_location() -> String {
    "eastus".to_string()
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            target: default_target(),
            port: default_port(),
            image_name: None,
            azure_resource_group: None,
            azure_location: default_location(),
            azure_subscription_id: None,
        }
    }
}
