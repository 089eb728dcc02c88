use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The SDK family backing an agent.
///
/// Orchestration code never branches on the concrete adapter type; the only
/// backend-specific decision is whether an agent qualifies for the native
/// group-chat path, which is a capability of the OpenAI adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// OpenAI chat completions. Supports native multi-party group chat.
    OpenAi,
    /// Anthropic messages.
    Anthropic,
    /// Local Ollama server.
    Ollama,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::OpenAi => "openai",
            Backend::Anthropic => "anthropic",
            Backend::Ollama => "ollama",
        }
    }

    /// Whether this backend provides its own multi-party conversation
    /// mechanism (used by the group strategy).
    pub fn supports_group_chat(&self) -> bool {
        matches!(self, Backend::OpenAi)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common interface for all agent backends.
///
/// Every adapter wraps its SDK behind this trait so the pipeline can treat
/// agents uniformly: accept a text task, return a text reply, support being
/// reset to a blank conversation.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Unique agent name within a pipeline run.
    fn name(&self) -> &str;

    /// Which SDK backs this agent.
    fn backend(&self) -> Backend;

    /// Role instructions (system prompt). The supervisor strategy reads these
    /// when building its routing prompt.
    fn instructions(&self) -> &str;

    /// Send `message` to the agent and return its final text reply.
    ///
    /// Conversation state, if any, lives inside the adapter. Retry and backoff
    /// also belong to the adapter; the pipeline awaits each call to completion
    /// and propagates failures unchanged.
    async fn run(&self, message: &str) -> Result<String>;

    /// Clear conversation history so the agent starts fresh.
    async fn reset(&self);
}
