use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::{CrawlDocsTool, FetchPageTool, Tool, WebSearchTool};
use crate::config::ToolConfig;
use crate::error::EnsembleError;

/// Registry for tools.
///
/// An explicit value handed to whoever constructs agents — there is no
/// process-wide default. Agent configs reference tools by name and the
/// factory resolves them here at construction time.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Create a registry pre-loaded with all built-in tools.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(WebSearchTool);
        registry.register(FetchPageTool::new());
        registry.register(CrawlDocsTool::new());
        registry
    }

    /// Register a tool
    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.name().to_string();
        debug!(tool = %name, "tool registered");
        self.tools.insert(name, Arc::new(tool));
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Get all tools
    pub fn all(&self) -> Vec<Arc<dyn Tool>> {
        self.tools.values().cloned().collect()
    }

    /// Get tool names
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Resolve the tools an agent config declares.
    ///
    /// An unknown name is a configuration error, reported with the set of
    /// registered names.
    pub fn resolve(&self, configs: &[ToolConfig]) -> Result<Vec<Arc<dyn Tool>>, EnsembleError> {
        configs
            .iter()
            .map(|tc| {
                self.get(&tc.name).ok_or_else(|| {
                    let mut known = self.names();
                    known.sort_unstable();
                    EnsembleError::Config(format!(
                        "tool '{}' not found in registry (registered: {})",
                        tc.name,
                        known.join(", ")
                    ))
                })
            })
            .collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
