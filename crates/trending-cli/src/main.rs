// crates/trending-cli/src/main.rs
//
// CLI entrypoint for the trending score store.
//
// Loads configuration, initializes tracing, opens the RocksDB-backed
// store and dispatches to the add/get/incr/deflate/delete/scan commands.

mod commands;
mod config;
mod output;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use commands::record::{AddCmd, DeflateCmd, DeleteCmd, GetCmd, IncrCmd};
use commands::scan::ScanCmd;
use config::CliConfig;
use output::OutputFormat;
use trending_core::record::RANKING_INDEX;
use trending_store::{RocksKvStore, TrendingStore};

/// Trending CLI: maintain and rank decaying popularity scores.
#[derive(Parser, Debug)]
#[command(
    name = "trending",
    version = "0.1.0",
    about = "Trending score store: conditional score updates and ranked scans"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = "~/.trending/config.toml")]
    config: String,

    /// Override the data directory from the config file.
    #[arg(long, global = true)]
    data_dir: Option<String>,

    /// Print records as JSON instead of a table.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Create a new trending record.
    Add(AddCmd),

    /// Read a trending record.
    Get(GetCmd),

    /// Increase a record's score if it has not been deflated since.
    Incr(IncrCmd),

    /// Lower a record's score if it is unchanged since it was read.
    Deflate(DeflateCmd),

    /// Delete a trending record, optionally only at a known score.
    Delete(DeleteCmd),

    /// List one item type's records in ascending score order.
    Scan(ScanCmd),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    // Config is read before tracing starts so its log level can apply.
    let loaded = CliConfig::load(&cli.config);
    let mut config = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => CliConfig::default(),
    };
    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = data_dir.clone();
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match &loaded {
        Ok(_) => tracing::debug!("Loaded configuration from {}", cli.config),
        // A missing default config file is normal; anything else is worth a warning.
        Err(e) if std::path::Path::new(&config::expand_tilde(&cli.config)).exists() => {
            tracing::warn!(
                "Could not load config from {}: {}. Using defaults.",
                cli.config,
                e
            )
        }
        Err(_) => tracing::debug!("No config file at {}. Using defaults.", cli.config),
    }

    let db_path = config.db_path();
    std::fs::create_dir_all(&db_path)?;
    tracing::debug!("Opening trending store at {}", db_path);

    let kv = RocksKvStore::open(&db_path)?.with_index(RANKING_INDEX);
    let store = TrendingStore::new(Arc::new(kv)).with_page_size(config.page_size);

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Table
    };
    let default_type = config.default_item_type.as_str();

    match &cli.command {
        Commands::Add(cmd) => commands::record::add(&store, cmd, default_type, format).await?,
        Commands::Get(cmd) => commands::record::get(&store, cmd, default_type, format).await?,
        Commands::Incr(cmd) => commands::record::incr(&store, cmd, default_type, format).await?,
        Commands::Deflate(cmd) => {
            commands::record::deflate(&store, cmd, default_type, format).await?
        }
        Commands::Delete(cmd) => {
            commands::record::delete(&store, cmd, default_type, format).await?
        }
        Commands::Scan(cmd) => commands::scan::run(&store, cmd, default_type, format).await?,
    }

    Ok(())
}
