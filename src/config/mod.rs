// Configuration management module
// TOML settings file plus environment overrides

pub mod settings;

#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use console::style;

pub use settings::{
    Config, ConfigError, ContentConfig, DEFAULT_PORT, EmbeddingConfig, EmbeddingProviderKind,
    OllamaConfig, SearchConfig, ServerConfig,
};

/// Print the effective configuration
#[inline]
pub fn show_config() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    println!("{}", style("📋 Current Configuration").bold().cyan());
    println!();

    println!("{}", style("Embedding Settings:").bold().yellow());
    let provider = match config.embedding.provider {
        EmbeddingProviderKind::Ollama => "ollama",
        EmbeddingProviderKind::Hashing => "hashing",
    };
    println!("  Provider: {}", style(provider).cyan());
    match config.embedding.provider {
        EmbeddingProviderKind::Ollama => {
            println!("  Model: {}", style(&config.ollama.model).cyan());
            match config.ollama_url() {
                Ok(url) => println!("  Ollama URL: {}", style(url).cyan()),
                Err(e) => println!("  Ollama URL: {} ({})", style("Invalid").red(), e),
            }
        }
        EmbeddingProviderKind::Hashing => {
            println!("  Dimensions: {}", style(config.embedding.dimensions).cyan());
        }
    }

    println!();
    println!("{}", style("Server Settings:").bold().yellow());
    println!(
        "  Bind: {}",
        style(format!("{}:{}", config.server.host, config.server.port)).cyan()
    );
    println!(
        "  Data directory: {}",
        style(config.data_dir().display()).cyan()
    );

    println!();
    println!("{}", style("Search Settings:").bold().yellow());
    println!("  Default top K: {}", style(config.search.default_top_k).cyan());
    println!("  Max top K: {}", style(config.search.max_top_k).cyan());
    println!(
        "  Query timeout: {}ms",
        style(config.search.query_timeout_ms).cyan()
    );
    println!(
        "  Ingest concurrency: {}",
        style(config.search.ingest_concurrency).cyan()
    );
    println!(
        "  Per-record timeout: {}ms",
        style(config.search.record_timeout_ms).cyan()
    );

    let config_path = Config::config_file_path().context("Failed to get config file path")?;
    println!();
    println!("Config file: {}", style(config_path.display()).dim());

    Ok(())
}
