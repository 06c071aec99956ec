mod config;
mod plan_cmd;
mod serve_cmd;

use std::sync::Arc;

use anyhow::bail;
use clap::{Parser, Subcommand};

use middag_core::pipeline::Pipeline;
use middag_kassalapp::KassalappClient;
use middag_llm::OpenAiGenerator;

use config::MiddagConfig;

#[derive(Parser)]
#[command(name = "middag", about = "Weekly dinner planner driven by grocery price drops")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a middag config file template
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Plan a week of dinners and print the shopping list as JSON
    Plan {
        /// What to plan for, in natural language
        #[arg(long, default_value = "Plan dinners for this week around current deals")]
        query: String,
        /// Comma-separated ingredients already on hand
        #[arg(long)]
        on_hand: Option<String>,
    },
    /// Run the HTTP planning server
    Serve {
        /// Bind address (overrides config)
        #[arg(long)]
        bind: Option<String>,
        /// Port (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },
}

/// Execute the `middag init` command: write the config template.
fn cmd_init(force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    config::save_config(config::CONFIG_TEMPLATE)?;

    println!("Config written to {}", path.display());
    println!("Fill in [kassalapp] api_key and [generator] api_key, then run `middag plan`.");
    Ok(())
}

/// Wire the real collaborators into a pipeline.
fn build_pipeline(config: &MiddagConfig) -> Pipeline {
    let catalog = Arc::new(KassalappClient::new(config.kassalapp.clone()));
    let generator = Arc::new(OpenAiGenerator::new(config.generator.clone(), catalog));
    Pipeline::new(generator)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { force } => {
            cmd_init(force)?;
        }
        Commands::Plan { query, on_hand } => {
            let config = MiddagConfig::resolve()?;
            let pipeline = build_pipeline(&config);
            let on_hand = plan_cmd::parse_on_hand(on_hand.as_deref());
            plan_cmd::run_plan(&pipeline, query, on_hand).await?;
        }
        Commands::Serve { bind, port } => {
            let config = MiddagConfig::resolve()?;
            let pipeline = Arc::new(build_pipeline(&config));
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            let port = port.unwrap_or(config.server.port);
            serve_cmd::run_serve(pipeline, &bind, port).await?;
        }
    }

    Ok(())
}
