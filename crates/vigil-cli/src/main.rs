//! vigil: seed import and inspection of the alert definitions catalog.
//!
//! # Usage
//!
//! ```text
//! vigil init --path /etc/vigil
//! vigil --config /etc/vigil/vigil.toml import
//! vigil --config /etc/vigil/vigil.toml triggers --tenant acme
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(
    name = "vigil",
    about = "Vigil alert definitions catalog",
    version,
    propagate_version = true
)]
struct Cli {
    /// Path to vigil.toml (default: ./vigil.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a scaffold vigil.toml
    Init {
        #[arg(short, long, default_value = ".")]
        path: PathBuf,
    },
    /// Load triggers, conditions, dampening and actions from seed files
    Import {
        /// Seed directory (default: [bootstrap].data_dir from the config)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
    /// Print every trigger of a tenant as JSON
    Triggers {
        #[arg(long)]
        tenant: String,
    },
    /// Print the condition sets of one trigger as JSON
    Conditions {
        #[arg(long)]
        tenant: String,
        #[arg(long)]
        trigger: String,
    },
    /// Print the trigger ids carrying a tag
    Tagged {
        #[arg(long)]
        tenant: String,
        #[arg(long, default_value = "")]
        category: String,
        #[arg(long)]
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = commands::load_config(cli.config.as_deref())?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Init { path } => commands::init::init(&path),
        Commands::Import { dir } => commands::import::import(&config, dir).await,
        Commands::Triggers { tenant } => commands::inspect::triggers(&config, &tenant).await,
        Commands::Conditions { tenant, trigger } => {
            commands::inspect::conditions(&config, &tenant, &trigger).await
        }
        Commands::Tagged {
            tenant,
            category,
            name,
        } => commands::inspect::tagged(&config, &tenant, &category, &name).await,
    }
}
