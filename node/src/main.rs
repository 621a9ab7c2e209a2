//! idledger node binary

use clap::{Parser, Subcommand};
use idledger_core::{NodeConfig, StorageBackend};
use idledger_node::NodeBuilder;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "idledger-node")]
#[command(about = "idledger node - organization registry and identifier hash ledger")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the node
    Run {
        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// API listen address
        #[arg(long)]
        api_addr: Option<String>,

        /// Data directory
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// State backend (memory or sled)
        #[arg(long)]
        backend: Option<StorageBackend>,

        /// Reject writes to keys that already exist
        #[arg(long)]
        enforce_uniqueness: bool,
    },

    /// Write a default configuration file
    Config {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            api_addr,
            data_dir,
            backend,
            enforce_uniqueness,
        } => {
            let node_config = match config {
                Some(path) => NodeConfig::load(&path)?,
                None => NodeConfig::default(),
            };

            init_logging(&node_config.log_level);
            info!("Starting idledger node...");

            let mut builder = NodeBuilder::new().config(node_config);
            if let Some(addr) = api_addr {
                builder = builder.api_addr(&addr);
            }
            if let Some(dir) = data_dir {
                builder = builder.data_dir(dir);
            }
            if let Some(backend) = backend {
                builder = builder.backend(backend);
            }
            if enforce_uniqueness {
                builder = builder.enforce_uniqueness();
            }

            let node = builder.build()?;
            node.start().await?;
        }

        Commands::Config { output } => {
            let json = NodeConfig::default().to_json()?;
            std::fs::write(&output, &json)?;

            println!("Configuration saved to: {}", output.display());
        }
    }

    Ok(())
}

/// `RUST_LOG` takes precedence over the configured level
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
