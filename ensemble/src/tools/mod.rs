mod docs_crawler;
mod registry;
mod web_search;

pub use docs_crawler::{CrawlDocsTool, FetchPageTool};
pub use registry::ToolRegistry;
pub use web_search::WebSearchTool;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// A tool that can be executed by an agent
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool
    fn name(&self) -> &str;

    /// A description of what this tool does
    fn description(&self) -> &str;

    /// JSON schema for the tool's parameters
    fn schema(&self) -> Value;

    /// Execute the tool with the given parameters
    async fn execute(&self, params: Value) -> Result<String>;
}

impl std::fmt::Debug for dyn Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool").field("name", &self.name()).finish()
    }
}
