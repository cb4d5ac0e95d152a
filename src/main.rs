use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use portfolio_search::commands::{list_sources, query, serve};
use portfolio_search::config::{Config, show_config};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "portfolio-search")]
#[command(about = "Semantic search over portfolio and blog content")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index in the background and serve the search API
    Serve {
        /// Address to bind, overriding the configured host and port
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Build the index and run a single search
    Query {
        /// Free-text search query
        text: String,
        /// Maximum number of results
        #[arg(long)]
        limit: Option<usize>,
    },
    /// List content sources and how many records each yields
    Sources,
    /// Show configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose {
        "portfolio_search=debug,tower_http=debug"
    } else {
        "portfolio_search=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Config { show } => {
            if !show {
                let path = Config::config_file_path().context("Failed to get config file path")?;
                println!("Edit {} to change settings.", path.display());
            }
            show_config()?;
        }
        Commands::Serve { bind } => {
            serve(Config::load()?, bind).await?;
        }
        Commands::Query { text, limit } => {
            query(Config::load()?, text, limit).await?;
        }
        Commands::Sources => {
            list_sources(Config::load()?).await?;
        }
    }

    Ok(())
}
