//! Local deployment — serve one configured agent over HTTP.
//!
//! Exposes:
//!   POST /run    body: {"message": "..."} → {"response": "..."}
//!   GET  /health → {"status": "ok", "agent": "<name>"}

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info};

use crate::agent::Agent;
use crate::backends::create_agent;
use crate::config::load_agent_config;
use crate::error::EnsembleError;
use crate::tools::ToolRegistry;

pub struct LocalDeployer {
    config_path: PathBuf,
    port: u16,
}

#[derive(Deserialize)]
struct RunRequest {
    message: String,
}

#[derive(Serialize)]
struct RunResponse {
    response: String,
}

impl LocalDeployer {
    pub fn new(config_path: impl Into<PathBuf>, port: u16) -> Self {
        Self {
            config_path: config_path.into(),
            port,
        }
    }

    /// Build the agent from its config file and serve it until interrupted.
    pub async fn deploy(&self) -> Result<(), EnsembleError> {
        let config = load_agent_config(&self.config_path)?;
        let registry = ToolRegistry::with_builtins();
        let agent = create_agent(config, &registry)?;

        info!(agent = agent.name(), port = self.port, "local deploy starting");

        let app = Router::new()
            .route("/health", get(health))
            .route("/run", post(run))
            .with_state(agent);

        let listener = tokio::net::TcpListener::bind(("0.0.0.0", self.port))
            .await
            .map_err(|e| EnsembleError::Deploy(format!("failed to bind port {}: {}", self.port, e)))?;

        axum::serve(listener, app)
            .await
            .map_err(|e| EnsembleError::Deploy(format!("server error: {e}")))
    }
}

async fn health(State(agent): State<Arc<dyn Agent>>) -> Json<Value> {
    Json(json!({ "status": "ok", "agent": agent.name() }))
}

async fn run(
    State(agent): State<Arc<dyn Agent>>,
    Json(request): Json<RunRequest>,
) -> Result<Json<RunResponse>, (StatusCode, String)> {
    match agent.run(&request.message).await {
        Ok(response) => Ok(Json(RunResponse { response })),
        Err(e) => {
            error!(agent = agent.name(), error = %format!("{e:#}"), "agent run failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}")))
        }
    }
}
