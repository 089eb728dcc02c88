//! Shared chat plumbing for the LLM-backed adapters.
//!
//! All three backends speak through the `llm` crate; they differ only in the
//! [`LLMBackend`] they select, how the API key is resolved, and their default
//! base URL. Each adapter owns a [`ChatSession`], which keeps the conversation
//! history and runs the bounded tool-call loop.

use anyhow::{Context, Result};
use llm::builder::{LLMBackend, LLMBuilder};
use llm::chat::{ChatMessage, ChatRole, FunctionTool, MessageType, Tool as LlmTool};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use crate::agent::Backend;
use crate::config::AgentConfig;
use crate::tools::Tool;

const API_TIMEOUT_SECS: u64 = 120;

/// A message in an agent's conversation history.
#[derive(Debug, Clone)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub tool_result: Option<ToolResult>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_result: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_result: None,
        }
    }

    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            tool_calls,
            tool_result: None,
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: String::new(),
            tool_calls: Vec::new(),
            tool_result: Some(ToolResult {
                tool_call_id: tool_call_id.into(),
                result: result.into(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
    Tool,
}

/// A tool call requested by the model.
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// Result of a tool execution, keyed to the call it answers.
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub result: String,
}

/// Conversation state plus everything needed to talk to one model.
pub(crate) struct ChatSession {
    backend: Backend,
    llm_backend: LLMBackend,
    config: AgentConfig,
    api_key: Option<String>,
    base_url: Option<String>,
    tools: Vec<Arc<dyn Tool>>,
    history: Mutex<Vec<Message>>,
}

impl ChatSession {
    pub(crate) fn new(
        backend: Backend,
        llm_backend: LLMBackend,
        config: AgentConfig,
        api_key: Option<String>,
        base_url: Option<String>,
        tools: Vec<Arc<dyn Tool>>,
    ) -> Self {
        Self {
            backend,
            llm_backend,
            config,
            api_key,
            base_url,
            tools,
            history: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.config.name
    }

    pub(crate) fn backend(&self) -> Backend {
        self.backend
    }

    pub(crate) fn instructions(&self) -> &str {
        &self.config.instructions
    }

    pub(crate) async fn reset(&self) {
        self.history.lock().await.clear();
        debug!(agent = %self.config.name, "conversation history cleared");
    }

    /// Append the user message and iterate with the model, executing tool
    /// calls, until it answers in plain text or `max_turns` is exhausted.
    pub(crate) async fn send(&self, message: &str) -> Result<String> {
        let mut history = self.history.lock().await;
        history.push(Message::user(message));

        for turn in 0..self.config.max_turns {
            debug!(agent = %self.config.name, turn, "llm turn");

            let response = self.chat_once(&history).await.with_context(|| {
                format!("agent '{}': LLM chat failed", self.config.name)
            })?;

            if response.tool_calls.is_empty() {
                let content = response.content;
                history.push(Message::assistant(content.clone()));
                return Ok(content);
            }

            let tool_calls = response.tool_calls;
            history.push(Message::assistant_with_tools(
                response.content,
                tool_calls.clone(),
            ));
            for call in &tool_calls {
                let result = self.execute_tool(call).await;
                debug!(agent = %self.config.name, tool = %call.name, "tool executed");
                history.push(Message::tool_result(&call.id, result));
            }
        }

        anyhow::bail!(
            "agent '{}' exceeded maximum turns ({})",
            self.config.name,
            self.config.max_turns
        );
    }

    async fn execute_tool(&self, call: &ToolCall) -> String {
        let Some(tool) = self.tools.iter().find(|t| t.name() == call.name) else {
            return format!("Error: unknown tool '{}'", call.name);
        };
        match tool.execute(call.arguments.clone()).await {
            Ok(output) => output,
            Err(e) => format!("Error: {e:#}"),
        }
    }

    /// One model round-trip over the current history.
    async fn chat_once(&self, history: &[Message]) -> Result<ChatTurn> {
        let llm_tools = build_llm_tools(&self.tools);
        let client = self.build_client(&llm_tools)?;
        let chat_messages: Vec<ChatMessage> = history.iter().filter_map(convert_message).collect();

        let api_timeout = Duration::from_secs(API_TIMEOUT_SECS);
        let response: Box<dyn llm::chat::ChatResponse> = if llm_tools.is_empty() {
            timeout(api_timeout, client.chat(&chat_messages))
                .await
                .with_context(|| {
                    format!("{} API call timed out after {}s", self.backend, API_TIMEOUT_SECS)
                })?
                .with_context(|| format!("failed to call {} API", self.backend))?
        } else {
            timeout(
                api_timeout,
                client.chat_with_tools(&chat_messages, Some(&llm_tools)),
            )
            .await
            .with_context(|| {
                format!("{} API call timed out after {}s", self.backend, API_TIMEOUT_SECS)
            })?
            .with_context(|| format!("failed to call {} API", self.backend))?
        };

        let tool_calls = parse_tool_calls(response.as_ref());
        let content = response.text().unwrap_or_else(|| {
            if tool_calls.is_empty() {
                warn!(agent = %self.config.name, "model returned empty response text");
            }
            String::new()
        });

        Ok(ChatTurn {
            content,
            tool_calls,
        })
    }

    // Rebuilt per call because the llm crate fixes tools at build time.
    fn build_client(&self, llm_tools: &[LlmTool]) -> Result<Box<dyn llm::LLMProvider>> {
        let mut builder = LLMBuilder::new()
            .backend(self.llm_backend.clone())
            .model(&self.config.llm.model)
            .system(&self.config.instructions)
            .max_tokens(self.config.llm.max_tokens)
            .temperature(self.config.llm.temperature);

        if let Some(ref key) = self.api_key {
            builder = builder.api_key(key);
        }
        if let Some(ref url) = self.base_url {
            builder = builder.base_url(url);
        }
        for tool in llm_tools {
            builder = builder.function(
                llm::builder::FunctionBuilder::new(&tool.function.name)
                    .description(&tool.function.description)
                    .json_schema(tool.function.parameters.clone()),
            );
        }

        builder.build().context("failed to build LLM client")
    }
}

struct ChatTurn {
    content: String,
    tool_calls: Vec<ToolCall>,
}

fn build_llm_tools(tools: &[Arc<dyn Tool>]) -> Vec<LlmTool> {
    tools
        .iter()
        .map(|t| LlmTool {
            tool_type: "function".to_string(),
            cache_control: None,
            function: FunctionTool {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.schema(),
            },
        })
        .collect()
}

fn parse_tool_calls(response: &dyn llm::chat::ChatResponse) -> Vec<ToolCall> {
    response
        .tool_calls()
        .map(|calls| {
            calls
                .iter()
                .map(|tc| {
                    let arguments = match serde_json::from_str(&tc.function.arguments) {
                        Ok(args) => args,
                        Err(e) => {
                            warn!(
                                tool = %tc.function.name,
                                error = %e,
                                "failed to parse tool call arguments as JSON"
                            );
                            serde_json::json!({
                                "error": format!("Failed to parse arguments: {}", e)
                            })
                        }
                    };
                    ToolCall {
                        id: tc.id.clone(),
                        name: tc.function.name.clone(),
                        arguments,
                    }
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Convert a history message to the llm crate's wire format.
fn convert_message(msg: &Message) -> Option<ChatMessage> {
    match msg.role {
        MessageRole::User => Some(ChatMessage {
            role: ChatRole::User,
            message_type: MessageType::Text,
            content: msg.content.clone(),
        }),
        MessageRole::Assistant => {
            if msg.tool_calls.is_empty() {
                Some(ChatMessage {
                    role: ChatRole::Assistant,
                    message_type: MessageType::Text,
                    content: msg.content.clone(),
                })
            } else {
                let tool_calls: Vec<llm::ToolCall> = msg
                    .tool_calls
                    .iter()
                    .map(|tc| llm::ToolCall {
                        id: tc.id.clone(),
                        call_type: "function".to_string(),
                        function: llm::FunctionCall {
                            name: tc.name.clone(),
                            arguments: tc.arguments.to_string(),
                        },
                    })
                    .collect();
                Some(ChatMessage {
                    role: ChatRole::Assistant,
                    message_type: MessageType::ToolUse(tool_calls),
                    content: msg.content.clone(),
                })
            }
        }
        MessageRole::Tool => msg.tool_result.as_ref().map(|result| {
            let tool_call = llm::ToolCall {
                id: result.tool_call_id.clone(),
                call_type: "function".to_string(),
                function: llm::FunctionCall {
                    name: String::new(),
                    arguments: result.result.clone(),
                },
            };
            ChatMessage {
                role: ChatRole::User,
                message_type: MessageType::ToolResult(vec![tool_call]),
                content: String::new(),
            }
        }),
    }
}
