//! Anthropic backend adapter.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use llm::builder::LLMBackend;

use super::chat::ChatSession;
use crate::agent::{Agent, Backend};
use crate::config::AgentConfig;
use crate::tools::Tool;

/// Agent backed by the Anthropic messages API.
pub struct AnthropicAgent {
    session: ChatSession,
}

impl AnthropicAgent {
    pub fn new(config: AgentConfig, api_key: String, tools: Vec<Arc<dyn Tool>>) -> Self {
        let base_url = config.llm.base_url.clone();
        Self {
            session: ChatSession::new(
                Backend::Anthropic,
                LLMBackend::Anthropic,
                config,
                Some(api_key),
                base_url,
                tools,
            ),
        }
    }
}

#[async_trait]
impl Agent for AnthropicAgent {
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
