//! Azure deployment — deploy the agent as an Azure Container App.
//!
//! Prerequisites: `az` CLI logged in (`az login`); the image is built with ACR
//! Tasks so local Docker is not required.

use std::path::PathBuf;

use tokio::process::Command;
use tracing::{debug, info};

use super::docker::run_command;
use crate::config::load_agent_config;
use crate::error::EnsembleError;

pub struct AzureDeployer {
    config_path: PathBuf,
    resource_group: String,
    location: String,
    subscription_id: Option<String>,
}

impl AzureDeployer {
    pub fn new(
        config_path: impl Into<PathBuf>,
        resource_group: impl Into<String>,
        location: impl Into<String>,
        subscription_id: Option<String>,
    ) -> Self {
        Self {
            config_path: config_path.into(),
            resource_group: resource_group.into(),
            location: location.into(),
            subscription_id,
        }
    }

    pub async fn deploy(&self) -> Result<(), EnsembleError> {
        let config = load_agent_config(&self.config_path)?;
        let app_name = config.name.to_lowercase().replace([' ', '_'], "-");
        let image = format!("{app_name}:latest");
        let acr_name = format!("{}acr", app_name.replace('-', ""));

        self.ensure_resource_group().await?;
        self.build_and_push(&acr_name, &image).await?;
        self.create_container_app(&app_name, &acr_name, &image).await?;
        self.print_endpoint(&app_name).await;
        Ok(())
    }

    async fn run_az(&self, args: &[&str]) -> Result<(), EnsembleError> {
        let mut full: Vec<&str> = args.to_vec();
        if let Some(ref sub) = self.subscription_id {
            full.push("--subscription");
            full.push(sub);
        }
        debug!(cmd = %format!("az {}", full.join(" ")), "running az command");
        run_command("az", &full).await
    }

    async fn ensure_resource_group(&self) -> Result<(), EnsembleError> {
        info!(group = %self.resource_group, location = %self.location, "ensuring resource group");
        self.run_az(&[
            "group",
            "create",
            "--name",
            &self.resource_group,
            "--location",
            &self.location,
        ])
        .await
    }

    async fn build_and_push(&self, acr_name: &str, image: &str) -> Result<(), EnsembleError> {
        info!(registry = acr_name, "creating container registry");
        self.run_az(&[
            "acr",
            "create",
            "--resource-group",
            &self.resource_group,
            "--name",
            acr_name,
            "--sku",
            "Basic",
            "--admin-enabled",
            "true",
        ])
        .await?;

        info!(image, "building image via ACR Tasks");
        self.run_az(&["acr", "build", "--registry", acr_name, "--image", image, "."])
            .await
    }

    async fn create_container_app(
        &self,
        app_name: &str,
        acr_name: &str,
        image: &str,
    ) -> Result<(), EnsembleError> {
        let env_name = format!("{app_name}-env");
        let registry_server = format!("{acr_name}.azurecr.io");
        let full_image = format!("{registry_server}/{image}");

        info!(env = %env_name, "creating container apps environment");
        self.run_az(&[
            "containerapp",
            "env",
            "create",
            "--name",
            &env_name,
            "--resource-group",
            &self.resource_group,
            "--location",
            &self.location,
        ])
        .await?;

        info!(app = app_name, "deploying container app");
        self.run_az(&[
            "containerapp",
            "create",
            "--name",
            app_name,
            "--resource-group",
            &self.resource_group,
            "--environment",
            &env_name,
            "--image",
            &full_image,
            "--registry-server",
            &registry_server,
            "--target-port",
            "8080",
            "--ingress",
            "external",
            "--min-replicas",
            "1",
            "--max-replicas",
            "3",
        ])
        .await
    }

    /// Best-effort: print the public endpoint if the CLI can resolve it.
    async fn print_endpoint(&self, app_name: &str) {
        let output = Command::new("az")
            .args([
                "containerapp",
                "show",
                "--name",
                app_name,
                "--resource-group",
                &self.resource_group,
                "--query",
                "properties.configuration.ingress.fqdn",
                "--output",
                "tsv",
            ])
            .output()
            .await;

        match output {
            Ok(out) => {
                let fqdn = String::from_utf8_lossy(&out.stdout).trim().to_string();
                if fqdn.is_empty() {
                    println!("Deployment complete. Check the Azure Portal for the endpoint URL.");
                } else {
                    println!("Agent deployed! Endpoint: https://{fqdn}/run");
                }
            }
            Err(_) => {
                println!("Deployment complete. Check the Azure Portal for the endpoint URL.");
            }
        }
    }
}
