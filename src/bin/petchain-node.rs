#![forbid(unsafe_code)]
//! PetChain node: loads the ledger and serves the HTTP API.

use clap::Parser;
use petchain::config::{load_config_from, DEFAULT_CONFIG_PATH};
use petchain::node::Node;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "petchain-node", version, about = "Serve a PetChain ledger over HTTP")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Override the API port
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the SQLite database path
    #[arg(long)]
    db: Option<String>,

    /// Validate persisted history before serving it
    #[arg(long)]
    verify: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = load_config_from(&args.config)?;
    if let Some(port) = args.port {
        config.api.port = port;
    }
    if let Some(db) = args.db {
        config.database.path = db;
    }
    if args.verify {
        config.ledger.verify_on_load = true;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let node = Node::init(config)?;
    node.start().await?;
    Ok(())
}
