use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::debug;

use super::schema::{AgentConfig, PipelineConfig};
use crate::error::EnsembleError;

/// Read and deserialize a YAML or JSON config file, chosen by extension.
fn read_file<T: DeserializeOwned>(path: &Path) -> Result<T, EnsembleError> {
    if !path.exists() {
        return Err(EnsembleError::Config(format!(
            "config file not found: {}",
            path.display()
        )));
    }
    let text = std::fs::read_to_string(path)
        .map_err(|e| EnsembleError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();

    match ext {
        "yaml" | "yml" => serde_yaml::from_str(&text)
            .map_err(|e| EnsembleError::Config(format!("invalid YAML in {}: {}", path.display(), e))),
        "json" => serde_json::from_str(&text)
            .map_err(|e| EnsembleError::Config(format!("invalid JSON in {}: {}", path.display(), e))),
        other => Err(EnsembleError::Config(format!(
            "unsupported config format '.{}' for {}: use .yaml, .yml, or .json",
            other,
            path.display()
        ))),
    }
}

/// Load and validate an [`AgentConfig`] from a YAML or JSON file.
pub fn load_agent_config(path: impl AsRef<Path>) -> Result<AgentConfig, EnsembleError> {
    let path = path.as_ref();
    let config: AgentConfig = read_file(path)?;
    config.validate()?;
    debug!(agent = %config.name, backend = %config.backend, "loaded agent config");
    Ok(config)
}

/// Load and validate a [`PipelineConfig`] from a YAML or JSON file.
pub fn load_pipeline_config(path: impl AsRef<Path>) -> Result<PipelineConfig, EnsembleError> {
    let path = path.as_ref();
    let config: PipelineConfig = read_file(path)?;
    config.validate()?;
    debug!(pipeline = %config.name, strategy = %config.strategy, "loaded pipeline config");
    Ok(config)
}
