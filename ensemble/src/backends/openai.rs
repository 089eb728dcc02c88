//! OpenAI backend adapter.
//!
//! Besides the single-agent adapter, this module hosts the native group-chat
//! driver used by the pipeline's group strategy: a shared-transcript,
//! round-robin conversation across several agents.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use llm::builder::LLMBackend;
use tracing::{debug, info};

use super::chat::ChatSession;
use crate::agent::{Agent, Backend};
use crate::config::AgentConfig;
use crate::tools::Tool;

/// A reply containing this marker ends a group chat early, before the round
/// limit is reached.
const TERMINATE_MARKER: &str = "TERMINATE";

/// Agent backed by the OpenAI chat completions API.
pub struct OpenAiAgent {
    session: ChatSession,
}

impl OpenAiAgent {
    pub fn new(config: AgentConfig, api_key: String, tools: Vec<Arc<dyn Tool>>) -> Self {
        let base_url = config.llm.base_url.clone();
        Self {
            session: ChatSession::new(
                Backend::OpenAi,
                LLMBackend::OpenAI,
                config,
                Some(api_key),
                base_url,
                tools,
            ),
        }
    }
}

#[async_trait]
impl Agent for OpenAiAgent {
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

/// Run a multi-party conversation across `agents` and return the final reply.
///
/// Agents take turns in the given order, each receiving the part of the shared
/// transcript it has not seen yet (every agent keeps its own conversation
/// history, so context accumulates across rounds). The chat ends when a reply
/// contains the terminate marker or after `max_rounds` full rounds.
pub async fn run_group_chat(
    agents: &[Arc<dyn Agent>],
    task: &str,
    max_rounds: usize,
) -> Result<String> {
    anyhow::ensure!(!agents.is_empty(), "group chat requires at least one agent");

    let roster = agents
        .iter()
        .map(|a| a.name())
        .collect::<Vec<_>>()
        .join(", ");
    info!(participants = %roster, max_rounds, "starting group chat");

    // Transcript entries visible to everyone. cursors[i] tracks how much of it
    // agent i has already been shown.
    let mut transcript: Vec<String> = vec![format!(
        "You are in a group discussion with: {roster}.\n\
         Work the task together. Reply with {TERMINATE_MARKER} when it is resolved.\n\n\
         Task: {task}"
    )];
    let mut cursors = vec![0usize; agents.len()];
    let mut last_reply = String::new();

    for round in 0..max_rounds {
        for (i, agent) in agents.iter().enumerate() {
            let unseen = transcript[cursors[i]..].join("\n\n");
            if unseen.is_empty() {
                // Nothing new since this agent's last turn; don't prompt it
                // with a blank message.
                debug!(round, agent = agent.name(), "no new transcript, skipping turn");
                continue;
            }
            cursors[i] = transcript.len() + 1; // will include this agent's own reply

            debug!(round, agent = agent.name(), "group chat turn");
            let reply = agent.run(&unseen).await?;
            transcript.push(format!("[{}]: {}", agent.name(), reply));

            let done = reply.contains(TERMINATE_MARKER);
            let cleaned = reply.replace(TERMINATE_MARKER, "").trim().to_string();
            if !cleaned.is_empty() {
                last_reply = cleaned;
            }
            if done {
                info!(round, agent = agent.name(), "group chat terminated");
                return Ok(last_reply);
            }
        }
    }

    info!(max_rounds, "group chat hit round limit");
    Ok(last_reply)
}
