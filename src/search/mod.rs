//! Query service and readiness gate
//!
//! [`SearchService`] owns the published [`VectorIndex`] and the process-wide
//! [`Readiness`] state. The ingestion pipeline publishes the index exactly
//! once; afterwards the index is immutable and queries read it without locks.

pub mod readiness;


use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::PortfolioError;
use crate::config::SearchConfig;
use crate::embeddings::EmbeddingProvider;
use crate::index::{SearchableRecord, VectorIndex};

pub use readiness::{Readiness, ReadinessState};

/// Failures surfaced to search callers
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("Search query is empty")]
    EmptyQuery,

    #[error("Search is not ready yet")]
    NotReady,

    #[error("Embedding provider unavailable: {0}")]
    EmbeddingUnavailable(String),
}

impl QueryError {
    /// Whether the caller may sensibly retry the same request later
    #[inline]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NotReady | Self::EmbeddingUnavailable(_))
    }
}

/// A ranked search result borrowing its record from the index
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit<'a> {
    pub record: &'a SearchableRecord,
    pub similarity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSettings {
    pub default_top_k: usize,
    pub query_timeout: Duration,
}

impl Default for SearchSettings {
    #[inline]
    fn default() -> Self {
        Self::from(&SearchConfig::default())
    }
}

impl From<&SearchConfig> for SearchSettings {
    #[inline]
    fn from(config: &SearchConfig) -> Self {
        Self {
            default_top_k: config.default_top_k,
            query_timeout: config.query_timeout(),
        }
    }
}

/// Snapshot of the index for status reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexStatus {
    pub state: ReadinessState,
    pub records: usize,
    pub dimension: Option<usize>,
    pub sources: BTreeMap<String, usize>,
    pub indexed_at: Option<DateTime<Utc>>,
}

pub struct SearchService {
    embedder: Arc<dyn EmbeddingProvider>,
    settings: SearchSettings,
    readiness: Readiness,
    index: OnceLock<VectorIndex>,
    indexed_at: OnceLock<DateTime<Utc>>,
}

impl SearchService {
    #[inline]
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, settings: SearchSettings) -> Self {
        Self {
            embedder,
            settings,
            readiness: Readiness::new(),
            index: OnceLock::new(),
            indexed_at: OnceLock::new(),
        }
    }

    #[inline]
    pub fn readiness(&self) -> ReadinessState {
        self.readiness.get()
    }

    #[inline]
    pub fn settings(&self) -> SearchSettings {
        self.settings
    }

    /// The published index, once readiness has reached `Ready`
    #[inline]
    pub fn index(&self) -> Option<&VectorIndex> {
        if self.readiness.is_ready() {
            self.index.get()
        } else {
            None
        }
    }

    /// `NotStarted → Indexing`. Fails if ingestion has already begun.
    #[inline]
    pub fn begin_indexing(&self) -> Result<(), PortfolioError> {
        self.readiness
            .transition(ReadinessState::NotStarted, ReadinessState::Indexing)
            .map_err(|_| PortfolioError::AlreadyIndexed)
    }

    /// Install the finished index and flip `Indexing → Ready`
    #[inline]
    pub fn publish(&self, index: VectorIndex) -> Result<(), PortfolioError> {
        if self.readiness.get() != ReadinessState::Indexing {
            return Err(PortfolioError::AlreadyIndexed);
        }

        self.index
            .set(index)
            .map_err(|_| PortfolioError::AlreadyIndexed)?;
        self.indexed_at
            .set(Utc::now())
            .map_err(|_| PortfolioError::AlreadyIndexed)?;

        self.readiness
            .transition(ReadinessState::Indexing, ReadinessState::Ready)
            .map_err(|_| PortfolioError::AlreadyIndexed)
    }

    #[inline]
    pub fn status(&self) -> IndexStatus {
        let index = self.index();
        IndexStatus {
            state: self.readiness(),
            records: index.map_or(0, VectorIndex::len),
            dimension: index.and_then(VectorIndex::dimension),
            sources: index.map(VectorIndex::count_by_source).unwrap_or_default(),
            indexed_at: self.indexed_at.get().copied(),
        }
    }

    /// Embed `query` and rank every indexed record against it.
    ///
    /// `top_k` defaults to the configured value and is clamped to `[1, index size]`.
    #[inline]
    pub async fn search(
        &self,
        query: &str,
        top_k: Option<usize>,
    ) -> Result<Vec<SearchHit<'_>>, QueryError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(QueryError::EmptyQuery);
        }

        let index = self.index().ok_or(QueryError::NotReady)?;

        let embedding =
            match tokio::time::timeout(self.settings.query_timeout, self.embedder.embed(query))
                .await
            {
                Ok(Ok(embedding)) => embedding,
                Ok(Err(e)) => {
                    warn!("Failed to embed search query: {:#}", e);
                    return Err(QueryError::EmbeddingUnavailable(e.to_string()));
                }
                Err(_) => {
                    warn!(
                        "Embedding search query timed out after {:?}",
                        self.settings.query_timeout
                    );
                    return Err(QueryError::EmbeddingUnavailable(format!(
                        "timed out after {:?}",
                        self.settings.query_timeout
                    )));
                }
            };

        if let Err(reason) = check_query_embedding(&embedding, index.dimension()) {
            warn!("Rejecting query embedding: {}", reason);
            return Err(QueryError::EmbeddingUnavailable(reason));
        }

        let top_k = top_k.unwrap_or(self.settings.default_top_k);
        let hits = rank(index, &embedding, top_k);

        debug!(
            "Query '{}' ranked {} records, returning {}",
            query,
            index.len(),
            hits.len()
        );
        Ok(hits)
    }
}

impl std::fmt::Debug for SearchService {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchService")
            .field("embedder", &self.embedder.name())
            .field("settings", &self.settings)
            .field("readiness", &self.readiness.get())
            .finish_non_exhaustive()
    }
}

/// A query vector must be non-empty, finite and as wide as the indexed vectors
fn check_query_embedding(embedding: &[f32], dimension: Option<usize>) -> Result<(), String> {
    if embedding.is_empty() {
        return Err("provider returned an empty vector".to_string());
    }
    if embedding.iter().any(|v| !v.is_finite()) {
        return Err("provider returned non-finite values".to_string());
    }
    match dimension {
        Some(expected) if expected != embedding.len() => Err(format!(
            "query vector has {} dimensions, index holds {}",
            embedding.len(),
            expected
        )),
        _ => Ok(()),
    }
}

/// Score every record, sort by descending similarity and keep the best `top_k`.
///
/// The sort is stable, so equal scores keep insertion order.
#[inline]
pub fn rank<'a>(index: &'a VectorIndex, query: &[f32], top_k: usize) -> Vec<SearchHit<'a>> {
    let mut hits: Vec<SearchHit<'a>> = index
        .score_all(query)
        .into_iter()
        .map(|(record, similarity)| SearchHit { record, similarity })
        .collect();

    hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    hits.truncate(top_k.max(1));
    hits
}
