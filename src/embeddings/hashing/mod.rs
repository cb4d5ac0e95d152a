//! Deterministic, dependency-free embedding provider.
//!
//! Each lower-cased alphanumeric token contributes one feature for the whole
//! word and one half-weight feature per character trigram of the word padded
//! with `#`. Features are hashed (FNV-1a) into a fixed number of buckets and
//! the result is L2-normalised. Trigrams let morphological variants
//! ("caching" / "caches") land close together without a model.


use anyhow::Result;
use async_trait::async_trait;

use super::{EmbeddingProvider, normalize};

const TOKEN_WEIGHT: f32 = 1.0;
const TRIGRAM_WEIGHT: f32 = 0.5;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    #[inline]
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    #[inline]
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embed synchronously; never fails
    #[inline]
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.dimensions];

        for token in tokenize(text) {
            self.accumulate(&mut vector, &token, TOKEN_WEIGHT);

            let padded: Vec<char> = std::iter::once('#')
                .chain(token.chars())
                .chain(std::iter::once('#'))
                .collect();
            for window in padded.windows(3) {
                let trigram: String = window.iter().collect();
                self.accumulate(&mut vector, &trigram, TRIGRAM_WEIGHT);
            }
        }

        normalize(&mut vector);
        vector
    }

    fn accumulate(&self, vector: &mut [f32], feature: &str, weight: f32) {
        let bucket = (fnv1a(feature.as_bytes()) % self.dimensions as u64) as usize;
        vector[bucket] += weight;
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    #[inline]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_text(text))
    }

    #[inline]
    fn name(&self) -> &str {
        "hashing"
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}
