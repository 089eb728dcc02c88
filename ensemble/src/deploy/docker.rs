//! Docker deployment — generate a Dockerfile and run the agent in a container.

use std::path::PathBuf;

use tokio::process::Command;
use tracing::info;

use crate::config::load_agent_config;
use crate::error::EnsembleError;

pub struct DockerDeployer {
    config_path: PathBuf,
    image_name: Option<String>,
    port: u16,
}

impl DockerDeployer {
    pub fn new(config_path: impl Into<PathBuf>, image_name: Option<String>, port: u16) -> Self {
        Self {
            config_path: config_path.into(),
            image_name,
            port,
        }
    }

    pub async fn deploy(&self) -> Result<(), EnsembleError> {
        let config = load_agent_config(&self.config_path)?;
        let image = self
            .image_name
            .clone()
            .unwrap_or_else(|| config.name.to_lowercase().replace(' ', "-"));

        self.write_dockerfile()?;
        self.write_compose(&image)?;
        self.build(&image).await?;
        self.run(&image).await
    }

    fn write_dockerfile(&self) -> Result<(), EnsembleError> {
        let config = self.config_path.display();
        let content = format!(
            r#"FROM rust:1.85-slim AS build
WORKDIR /app
COPY . .
RUN cargo build --release -p ensemble-cli

FROM debian:bookworm-slim
RUN apt-get update && apt-get install -y ca-certificates && rm -rf /var/lib/apt/lists/*
WORKDIR /app
COPY --from=build /app/target/release/ensemble /usr/local/bin/ensemble
COPY {config} {config}
EXPOSE {port}
CMD ["ensemble", "deploy", "local", "{config}", "--port", "{port}"]
"#,
            port = self.port,
        );
        std::fs::write("Dockerfile", content)
            .map_err(|e| EnsembleError::Deploy(format!("failed to write Dockerfile: {e}")))?;
        info!("Dockerfile written");
        Ok(())
    }

    fn write_compose(&self, image: &str) -> Result<(), EnsembleError> {
        let content = format!(
            r#"services:
  {image}:
    build: .
    image: {image}
    ports:
      - "{port}:{port}"
    environment:
      - OPENAI_API_KEY=${{OPENAI_API_KEY}}
      - ANTHROPIC_API_KEY=${{ANTHROPIC_API_KEY}}
    restart: unless-stopped
"#,
            port = self.port,
        );
        std::fs::write("docker-compose.yml", content)
            .map_err(|e| EnsembleError::Deploy(format!("failed to write docker-compose.yml: {e}")))?;
        info!("docker-compose.yml written");
        Ok(())
    }

    async fn build(&self, image: &str) -> Result<(), EnsembleError> {
        info!(image, "building Docker image");
        run_command("docker", &["build", "-t", image, "."]).await
    }

    async fn run(&self, image: &str) -> Result<(), EnsembleError> {
        let publish = format!("{}:{}", self.port, self.port);
        info!(image, port = self.port, "starting container");
        run_command(
            "docker",
            &["run", "--rm", "-p", &publish, "--env-file", ".env", image],
        )
        .await
    }
}

pub(crate) async fn run_command(program: &str, args: &[&str]) -> Result<(), EnsembleError> {
    let status = Command::new(program)
        .args(args)
        .status()
        .await
        .map_err(|e| EnsembleError::Deploy(format!("failed to run {program}: {e}")))?;
    if !status.success() {
        return Err(EnsembleError::Deploy(format!(
            "{program} {} exited with {status}",
            args.join(" ")
        )));
    }
    Ok(())
}
