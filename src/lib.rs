use thiserror::Error;

pub type Result<T> = std::result::Result<T, PortfolioError>;

#[derive(Error, Debug)]
pub enum PortfolioError {
    #[error("Content source '{source_id}' unavailable: {message}")]
    SourceUnavailable { source_id: String, message: String },

    #[error("Embedding failed for '{title}': {message}")]
    EmbeddingFailed { title: String, message: String },

    #[error("Index error: {0}")]
    Index(#[from] index::IndexError),

    #[error("Ingestion has already run for this process")]
    AlreadyIndexed,
}

pub mod commands;
pub mod config;
pub mod content;
pub mod embeddings;
pub mod index;
pub mod ingest;
pub mod search;
pub mod server;
