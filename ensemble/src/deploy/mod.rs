mod azure;
mod docker;
mod local;

pub use azure::AzureDeployer;
pub use docker::DockerDeployer;
pub use local::LocalDeployer;
