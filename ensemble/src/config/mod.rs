mod loader;
mod schema;

pub use loader::{load_agent_config, load_pipeline_config};
pub use schema::{
    AgentConfig, DeployConfig, DeployTarget, LlmConfig, PipelineConfig, Strategy, ToolConfig,
};
