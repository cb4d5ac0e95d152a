use anyhow::{Context, Result, anyhow};
use console::style;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::{Config, EmbeddingProviderKind};
use crate::content::SourceRegistry;
use crate::embeddings::{OllamaClient, build_provider};
use crate::ingest::{IngestSettings, IngestionPipeline, IngestionStats};
use crate::search::{SearchService, SearchSettings};
use crate::server::{AppState, start_server};

/// Build the query service and ingestion pipeline described by `config`
fn build_pipeline(config: &Config) -> Result<(Arc<SearchService>, IngestionPipeline)> {
    let embedder = build_provider(config)?;
    let service = Arc::new(SearchService::new(
        Arc::clone(&embedder),
        SearchSettings::from(&config.search),
    ));

    let data_dir = config.data_dir();
    let registry = SourceRegistry::from_data_dir(&data_dir);
    info!(
        "Registered content sources {:?} from {}",
        registry.ids(),
        data_dir.display()
    );

    let pipeline = IngestionPipeline::new(
        registry,
        embedder,
        IngestSettings::from(&config.search),
    );
    Ok((service, pipeline))
}

/// Warn early when the configured Ollama server is unreachable
fn check_ollama(config: &Config) {
    if config.embedding.provider != EmbeddingProviderKind::Ollama {
        return;
    }

    match OllamaClient::new(&config.ollama) {
        Ok(client) => match client.health_check() {
            Ok(()) => info!(
                "Ollama connected at {}:{} with model {}",
                config.ollama.host, config.ollama.port, config.ollama.model
            ),
            Err(e) => {
                warn!("Ollama is reachable but unhealthy: {}", e);
                println!("Warning: Ollama may not be ready. Records may fail to embed.");
            }
        },
        Err(e) => warn!("Failed to create Ollama client: {}", e),
    }
}

/// Serve the search API while the index is built in the background.
///
/// Requests arriving before ingestion finishes get 503. A fatal ingestion
/// error stops the server.
#[inline]
pub async fn serve(config: Config, bind: Option<SocketAddr>) -> Result<()> {
    let addr = match bind {
        Some(addr) => addr,
        None => config.bind_addr().context("Invalid server address")?,
    };

    tokio::task::spawn_blocking({
        let config = config.clone();
        move || check_ollama(&config)
    })
    .await
    .context("Ollama health check task failed")?;

    let (service, pipeline) = build_pipeline(&config)?;
    let state = AppState::new(Arc::clone(&service), config.search.max_top_k);

    let mut ingestion = pipeline.spawn(service);
    let server = start_server(addr, state, shutdown_signal());
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => return result,
        joined = &mut ingestion => {
            match joined.context("Ingestion task panicked")? {
                Ok(stats) => info!("Search is ready ({} records)", stats.records_indexed),
                Err(e) => {
                    error!("Ingestion aborted, shutting down: {}", e);
                    return Err(anyhow!(e).context("Ingestion failed"));
                }
            }
        }
    }

    server.await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
}

/// Build the index in the foreground and run a single query against it
#[inline]
pub async fn query(config: Config, text: String, limit: Option<usize>) -> Result<()> {
    let (service, pipeline) = build_pipeline(&config)?;
    let stats = pipeline
        .run(&service)
        .await
        .context("Failed to build search index")?;
    print_ingestion_summary(&stats);

    let limit = limit.map(|l| l.min(config.search.max_top_k));
    let hits = service
        .search(&text, limit)
        .await
        .map_err(|e| anyhow!(e))
        .with_context(|| format!("Search for '{}' failed", text.trim()))?;

    if hits.is_empty() {
        println!("No results for '{}'.", text.trim());
        return Ok(());
    }

    println!();
    println!(
        "{}",
        style(format!("🔍 Results for '{}'", text.trim())).bold().cyan()
    );
    for (rank, hit) in hits.iter().enumerate() {
        println!(
            "{:>3}. {} {} {}",
            rank + 1,
            style(format!("{:.4}", hit.similarity)).green(),
            style(format!("[{}]", hit.record.source_id())).dim(),
            hit.record.title()
        );
    }

    Ok(())
}

fn print_ingestion_summary(stats: &IngestionStats) {
    println!(
        "Indexed {} records from {} sources in {:?}",
        stats.records_indexed, stats.sources_processed, stats.duration
    );
    if stats.sources_failed > 0 {
        println!(
            "  {} {} sources unavailable",
            style("⚠️").yellow(),
            stats.sources_failed
        );
    }
    if stats.embedding_failures > 0 {
        println!(
            "  {} {} records failed to embed",
            style("⚠️").yellow(),
            stats.embedding_failures
        );
    }
}

/// Fetch every content source and report what it yields
#[inline]
pub async fn list_sources(config: Config) -> Result<()> {
    let data_dir = config.data_dir();
    let registry = SourceRegistry::from_data_dir(&data_dir);

    println!(
        "{}",
        style(format!("📚 Content Sources ({})", data_dir.display()))
            .bold()
            .cyan()
    );
    println!();

    let mut total = 0;
    for source in registry.sources() {
        match source.fetch().await {
            Ok(payload) => {
                total += payload.len();
                println!(
                    "   ✅ {}: {} records",
                    style(source.id()).bold(),
                    payload.len()
                );
            }
            Err(e) => {
                println!(
                    "   ❌ {}: {}",
                    style(source.id()).bold(),
                    style(format!("{:#}", e)).red()
                );
            }
        }
    }

    println!();
    println!("Total records: {}", total);
    Ok(())
}
