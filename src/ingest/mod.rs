// Ingestion module
// Pulls records from every content source, embeds them and publishes the index once


use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::{StreamExt, stream};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::SearchConfig;
use crate::content::{RawRecord, SourceRegistry};
use crate::embeddings::EmbeddingProvider;
use crate::index::{SearchableRecord, VectorIndex};
use crate::search::SearchService;
use crate::{PortfolioError, Result};

/// Embedding fan-out settings for a single ingestion pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestSettings {
    /// Maximum embedding calls in flight
    pub concurrency: usize,
    /// Per-record embedding timeout
    pub record_timeout: Duration,
}

impl Default for IngestSettings {
    #[inline]
    fn default() -> Self {
        Self::from(&SearchConfig::default())
    }
}

impl From<&SearchConfig> for IngestSettings {
    #[inline]
    fn from(config: &SearchConfig) -> Self {
        Self {
            concurrency: config.ingest_concurrency,
            record_timeout: config.record_timeout(),
        }
    }
}

/// Statistics about an ingestion pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestionStats {
    pub sources_processed: usize,
    pub sources_failed: usize,
    pub records_seen: usize,
    pub records_indexed: usize,
    pub records_skipped: usize,
    pub embedding_failures: usize,
    pub duration: Duration,
}

/// Builds the vector index from the content sources, exactly once per [`SearchService`]
pub struct IngestionPipeline {
    registry: SourceRegistry,
    embedder: Arc<dyn EmbeddingProvider>,
    settings: IngestSettings,
}

impl IngestionPipeline {
    #[inline]
    pub fn new(
        registry: SourceRegistry,
        embedder: Arc<dyn EmbeddingProvider>,
        settings: IngestSettings,
    ) -> Self {
        Self {
            registry,
            embedder,
            settings: IngestSettings {
                concurrency: settings.concurrency.max(1),
                ..settings
            },
        }
    }

    /// Run ingestion on a background task
    #[inline]
    pub fn spawn(self, service: Arc<SearchService>) -> JoinHandle<Result<IngestionStats>> {
        tokio::spawn(async move {
            let result = self.run(&service).await;
            if let Err(e) = &result {
                error!("Ingestion failed: {}", e);
            }
            result
        })
    }

    /// Ingest every source and publish the index, moving the service to `Ready`.
    ///
    /// Source and per-record failures are logged and skipped. Only a broken
    /// index invariant (dimension mismatch) or a second run aborts.
    #[inline]
    pub async fn run(&self, service: &SearchService) -> Result<IngestionStats> {
        service.begin_indexing()?;

        info!(
            "Starting ingestion from {} sources using {} embeddings",
            self.registry.len(),
            self.embedder.name()
        );

        let started = Instant::now();
        let mut stats = IngestionStats::default();

        let records = self.collect_records(&mut stats).await;
        let index = self.embed_records(records, &mut stats).await?;

        stats.records_indexed = index.len();
        service.publish(index)?;
        stats.duration = started.elapsed();

        info!(
            "Ingestion complete: {} records indexed from {} sources ({} sources failed, {} embedding failures, {} skipped) in {:?}",
            stats.records_indexed,
            stats.sources_processed,
            stats.sources_failed,
            stats.embedding_failures,
            stats.records_skipped,
            stats.duration
        );

        Ok(stats)
    }

    async fn collect_records(&self, stats: &mut IngestionStats) -> Vec<RawRecord> {
        let mut records = Vec::new();

        for source in self.registry.sources() {
            let payload = match source.fetch().await {
                Ok(payload) => payload,
                Err(e) => {
                    let failure = PortfolioError::SourceUnavailable {
                        source_id: source.id().to_string(),
                        message: format!("{:#}", e),
                    };
                    warn!("Skipping source: {}", failure);
                    stats.sources_failed += 1;
                    continue;
                }
            };

            stats.sources_processed += 1;
            debug!("Source '{}' yielded {} records", source.id(), payload.len());

            for record in payload.into_records(source.id()) {
                stats.records_seen += 1;
                if record.title.trim().is_empty() {
                    warn!("Skipping untitled record from source '{}'", record.source_id);
                    stats.records_skipped += 1;
                    continue;
                }
                records.push(record);
            }
        }

        records
    }

    async fn embed_records(
        &self,
        records: Vec<RawRecord>,
        stats: &mut IngestionStats,
    ) -> Result<VectorIndex> {
        let embedder = &self.embedder;
        let timeout = self.settings.record_timeout;

        // `buffered` yields in input order regardless of completion order
        let mut embedded = stream::iter(records.into_iter().map(|record| async move {
            let input = record.embedding_input();
            let outcome = tokio::time::timeout(timeout, embedder.embed(&input)).await;
            (record, outcome)
        }))
        .buffered(self.settings.concurrency);

        let mut index = VectorIndex::new();

        while let Some((record, outcome)) = embedded.next().await {
            let result = match outcome {
                Ok(Ok(embedding)) if embedding.is_empty() => {
                    Err("provider returned an empty vector".to_string())
                }
                Ok(Ok(embedding)) if embedding.iter().any(|v| !v.is_finite()) => {
                    Err("provider returned non-finite values".to_string())
                }
                Ok(Ok(embedding)) => Ok(embedding),
                Ok(Err(e)) => Err(format!("{:#}", e)),
                Err(_) => Err(format!("timed out after {:?}", timeout)),
            };

            let embedding = match result {
                Ok(embedding) => embedding,
                Err(message) => {
                    let failure = PortfolioError::EmbeddingFailed {
                        title: record.title,
                        message,
                    };
                    warn!("Skipping record: {}", failure);
                    stats.embedding_failures += 1;
                    continue;
                }
            };

            debug!("Indexed '{}' from '{}'", record.title, record.source_id);
            index.add(SearchableRecord::new(record, embedding))?;
        }

        Ok(index)
    }
}
