pub mod agent;
pub mod backends;
pub mod config;
pub mod deploy;
pub mod error;
pub mod event;
pub mod pipeline;
pub mod tools;

pub use agent::{Agent, Backend};
pub use backends::{create_agent, AnthropicAgent, OllamaAgent, OpenAiAgent};
pub use config::{
    load_agent_config, load_pipeline_config, AgentConfig, DeployConfig, DeployTarget, LlmConfig,
    PipelineConfig, Strategy, ToolConfig,
};
pub use deploy::{AzureDeployer, DockerDeployer, LocalDeployer};
pub use error::EnsembleError;
pub use event::{Event, EventSender};
pub use pipeline::Pipeline;
pub use tools::{CrawlDocsTool, FetchPageTool, Tool, ToolRegistry, WebSearchTool};
