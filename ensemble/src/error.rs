#[derive(Debug, thiserror::Error)]
pub enum EnsembleError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("agent error: {agent_name}: {message}")]
    Agent { agent_name: String, message: String },

    #[error("backend error: {0}")]
    Backend(String),

    #[error("tool error: {tool_name}: {message}")]
    Tool { tool_name: String, message: String },

    #[error("deploy error: {0}")]
    Deploy(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
