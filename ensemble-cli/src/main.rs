use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ensemble::{
    create_agent, load_agent_config, load_pipeline_config, Agent, AzureDeployer, DockerDeployer,
    LocalDeployer, Pipeline, ToolRegistry,
};

#[derive(Parser)]
#[command(name = "ensemble", version)]
#[command(about = "Compose AI agents from different backends into pipelines", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scaffold a new agent project
    Init {
        /// Project directory
        #[arg(default_value = ".")]
        project_dir: String,
    },

    /// Create an agent config template
    Create {
        /// Agent name
        name: String,

        /// Backend: openai, anthropic, or ollama
        #[arg(long, default_value = "openai")]
        backend: String,

        /// Directory to write the config into
        #[arg(long, default_value = "agents")]
        out_dir: String,
    },

    /// Run a single agent with a message
    Run {
        /// Path to the agent config (yaml or json)
        config: String,

        /// The message to send
        message: String,
    },

    /// Start an interactive terminal chat with an agent
    Chat {
        /// Path to the agent config
        config: String,
    },

    /// Multi-agent pipeline commands
    #[command(subcommand)]
    Pipeline(PipelineCommands),

    /// List agent configs in a directory
    List {
        /// Directory containing agent configs
        #[arg(default_value = "agents")]
        agents_dir: String,
    },

    /// Deployment commands
    #[command(subcommand)]
    Deploy(DeployCommands),
}

#[derive(Subcommand)]
enum PipelineCommands {
    /// Run a multi-agent pipeline with a task
    Run {
        /// Path to the pipeline config
        config: String,

        /// The task to resolve
        task: String,

        /// Directory containing the agent configs the pipeline references
        #[arg(long, default_value = "agents")]
        agents_dir: String,
    },
}

#[derive(Subcommand)]
enum DeployCommands {
    /// Run the agent as a local HTTP server
    Local {
        /// Path to the agent config
        config: String,

        #[arg(long, default_value_t = 8080)]
        port: u16,
    },

    /// Build and run the agent in a Docker container
    Docker {
        /// Path to the agent config
        config: String,

        /// Docker image name (defaults to the agent name)
        #[arg(long)]
        image: Option<String>,

        #[arg(long, default_value_t = 8080)]
        port: u16,
    },

    /// Deploy the agent to Azure Container Apps
    Azure {
        /// Path to the agent config
        config: String,

        /// Azure resource group (or set AZURE_RESOURCE_GROUP)
        #[arg(long)]
        resource_group: Option<String>,

        #[arg(long, default_value = "eastus")]
        location: String,

        /// Azure subscription id (or set AZURE_SUBSCRIPTION_ID)
        #[arg(long)]
        subscription: Option<String>,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive("info".parse().expect("valid log directive"))
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Init { project_dir } => init_project(&project_dir),
        Commands::Create {
            name,
            backend,
            out_dir,
        } => create_template(&name, &backend, &out_dir),
        Commands::Run { config, message } => {
            let agent = build_agent(&config)?;
            println!("Running agent '{}' [{}]...", agent.name(), agent.backend());
            let response = agent
                .run(&message)
                .await
                .with_context(|| format!("agent '{}' failed", agent.name()))?;
            println!("\n--- Response ---");
            println!("{response}");
            Ok(())
        }
        Commands::Chat { config } => chat_loop(&config).await,
        Commands::Pipeline(PipelineCommands::Run {
            config,
            task,
            agents_dir,
        }) => run_pipeline(&config, &task, &agents_dir).await,
        Commands::List { agents_dir } => list_agents(&agents_dir),
        Commands::Deploy(deploy) => match deploy {
            DeployCommands::Local { config, port } => {
                LocalDeployer::new(config, port).deploy().await?;
                Ok(())
            }
            DeployCommands::Docker {
                config,
                image,
                port,
            } => {
                DockerDeployer::new(config, image, port).deploy().await?;
                Ok(())
            }
            DeployCommands::Azure {
                config,
                resource_group,
                location,
                subscription,
            } => {
                let group = resource_group
                    .or_else(|| std::env::var("AZURE_RESOURCE_GROUP").ok())
                    .context("pass --resource-group or set AZURE_RESOURCE_GROUP")?;
                let subscription =
                    subscription.or_else(|| std::env::var("AZURE_SUBSCRIPTION_ID").ok());
                AzureDeployer::new(config, group, location, subscription)
                    .deploy()
                    .await?;
                Ok(())
            }
        },
    }
}

fn build_agent(config_path: &str) -> Result<Arc<dyn Agent>> {
    let config = load_agent_config(config_path)?;
    let registry = ToolRegistry::with_builtins();
    Ok(create_agent(config, &registry)?)
}

async fn run_pipeline(config_path: &str, task: &str, agents_dir: &str) -> Result<()> {
    let pipeline_config = load_pipeline_config(config_path)?;
    let agents_path = Path::new(agents_dir);
    let registry = ToolRegistry::with_builtins();

    let mut agents: HashMap<String, Arc<dyn Agent>> = HashMap::new();
    for agent_name in &pipeline_config.agents {
        let config_file = find_agent_config(agents_path, agent_name)
            .with_context(|| format!("no config for agent '{agent_name}' in {agents_dir}/"))?;
        let agent_config = load_agent_config(&config_file)?;
        agents.insert(agent_name.clone(), create_agent(agent_config, &registry)?);
    }

    let pipeline = Pipeline::new(pipeline_config, agents)?;
    println!(
        "Running pipeline '{}' [{}]...",
        pipeline.name(),
        pipeline.strategy()
    );
    let result = pipeline.run(task).await?;
    println!("\n--- Pipeline Result ---");
    println!("{result}");
    Ok(())
}

/// Look for `<name>.yaml`, `<name>.yml`, or `<name>.json` in `dir`.
fn find_agent_config(dir: &Path, name: &str) -> Option<PathBuf> {
    ["yaml", "yml", "json"]
        .iter()
        .map(|ext| dir.join(format!("{name}.{ext}")))
        .find(|p| p.exists())
}

async fn chat_loop(config_path: &str) -> Result<()> {
    let agent = build_agent(config_path)?;

    println!("\nChatting with '{}' [{}]", agent.name(), agent.backend());
    println!("Type 'exit' or 'quit' to stop. Type 'reset' to clear conversation history.\n");

    let stdin = std::io::stdin();
    loop {
        print!("You: ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            println!("\nGoodbye!");
            break;
        }
        let input = line.trim();

        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            println!("Goodbye!");
            break;
        }
        if input.eq_ignore_ascii_case("reset") {
            agent.reset().await;
            println!("[Conversation history cleared]");
            continue;
        }

        match agent.run(input).await {
            Ok(response) => println!("\nAgent: {response}\n"),
            Err(e) => println!("[Error] {e:#}"),
        }
    }
    Ok(())
}

fn init_project(project_dir: &str) -> Result<()> {
    let base = Path::new(project_dir);
    for dir in ["agents", "pipelines"] {
        let path = base.join(dir);
        std::fs::create_dir_all(&path)?;
        println!("  created {}", path.display());
    }

    write_if_missing(
        &base.join("agents").join("example-agent.yaml"),
        "name: example-agent\n\
         backend: openai          # openai | anthropic | ollama\n\
         instructions: \"You are a helpful assistant.\"\n\
         llm:\n\
         \x20 model: gpt-4o\n\
         tools:\n\
         \x20 - name: web_search\n\
         max_turns: 5\n",
    )?;

    write_if_missing(
        &base.join("pipelines").join("example-pipeline.yaml"),
        "name: example-pipeline\n\
         agents:\n\
         \x20 - example-agent\n\
         strategy: sequential\n\
         max_rounds: 10\n",
    )?;

    write_if_missing(&base.join(".env.example"), "OPENAI_API_KEY=sk-...\n")?;
    println!(
        "\nProject scaffolded in '{project_dir}'. Edit agents/example-agent.yaml to get started."
    );
    Ok(())
}

fn create_template(name: &str, backend: &str, out_dir: &str) -> Result<()> {
    if !["openai", "anthropic", "ollama"].contains(&backend) {
        bail!("unknown backend '{backend}': choose openai | anthropic | ollama");
    }

    let out = Path::new(out_dir);
    std::fs::create_dir_all(out)?;
    let dest = out.join(format!("{name}.yaml"));
    if dest.exists() {
        bail!("'{}' already exists", dest.display());
    }

    let model = match backend {
        "anthropic" => "claude-sonnet-4-20250514",
        "ollama" => "llama3.2",
        _ => "gpt-4o",
    };
    let content = format!(
        "name: {name}\n\
         backend: {backend}\n\
         instructions: \"You are a helpful assistant named {name}.\"\n\
         llm:\n\
         \x20 model: {model}\n\
         tools: []\n\
         max_turns: 10\n"
    );
    std::fs::write(&dest, content)?;
    println!("Created {}", dest.display());
    Ok(())
}

fn list_agents(agents_dir: &str) -> Result<()> {
    let path = Path::new(agents_dir);
    if !path.exists() {
        bail!("directory not found: {agents_dir}");
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(path)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            matches!(
                p.extension().and_then(|e| e.to_str()),
                Some("yaml" | "yml" | "json")
            )
        })
        .collect();
    files.sort();

    if files.is_empty() {
        println!("No agent configs found.");
        return Ok(());
    }

    println!("{:<25} {:<12} {:<25} FILE", "NAME", "BACKEND", "MODEL");
    println!("{}", "-".repeat(80));
    for file in files {
        // Skip pipeline configs and malformed files silently
        if let Ok(config) = load_agent_config(&file) {
            println!(
                "{:<25} {:<12} {:<25} {}",
                config.name,
                config.backend.to_string(),
                config.llm.model,
                file.display()
            );
        }
    }
    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if !path.exists() {
        std::fs::write(path, content)?;
        println!("  created {}", path.display());
    }
    Ok(())
}
