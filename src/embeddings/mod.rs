// Embeddings module
// Providers that turn text into fixed-length vectors, plus vector helpers

pub mod hashing;
pub mod ollama;


use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

use crate::config::{Config, EmbeddingProviderKind};

pub use hashing::HashingEmbedder;
pub use ollama::OllamaClient;

/// A text → vector function. Implementations may be slow and may fail.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single piece of text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Short human-readable name used in logs
    fn name(&self) -> &str;
}

/// Build the provider selected in the configuration
#[inline]
pub fn build_provider(config: &Config) -> Result<Arc<dyn EmbeddingProvider>> {
    let provider: Arc<dyn EmbeddingProvider> = match config.embedding.provider {
        EmbeddingProviderKind::Ollama => Arc::new(
            OllamaClient::new(&config.ollama).context("Failed to initialize Ollama client")?,
        ),
        EmbeddingProviderKind::Hashing => {
            Arc::new(HashingEmbedder::new(config.embedding.dimensions))
        }
    };

    info!("Using embedding provider: {}", provider.name());
    Ok(provider)
}

/// Euclidean length of a vector
#[inline]
pub fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|v| v * v).sum::<f32>().sqrt()
}

/// Scale a vector to unit length in place. Zero and non-finite vectors are left untouched.
#[inline]
pub fn normalize(vector: &mut [f32]) {
    let norm = l2_norm(vector);
    if norm > 0.0 && norm.is_finite() {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}
