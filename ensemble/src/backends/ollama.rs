//! Ollama backend adapter for locally served models. No API key required.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use llm::builder::LLMBackend;

use super::chat::ChatSession;
use crate::agent::{Agent, Backend};
use crate::config::AgentConfig;
use crate::tools::Tool;

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Agent backed by a local Ollama server.
pub struct OllamaAgent {
    session: ChatSession,
}

impl OllamaAgent {
    pub fn new(config: AgentConfig, tools: Vec<Arc<dyn Tool>>) -> Self {
        let base_url = config
            .llm
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
        Self {
            session: ChatSession::new(
                Backend::Ollama,
                LLMBackend::Ollama,
                config,
                None,
                Some(base_url),
                tools,
            ),
        }
    }
}

#[async_trait]
impl Agent for OllamaAgent {
    fn name(&self) -> &str {
        self.session.name()
    }

    fn backend(&self) -> Backend {
        self.session.backend()
    }

    fn instructions(&self) -> &str {
        self.session.instructions()
    }

    async fn run(&self, message: &str) -> Result<String> {
        self.session.send(message).await
    }

    async fn reset(&self) {
        self.session.reset().await;
    }
}
