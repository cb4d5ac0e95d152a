// In-memory vector index
// Append-only storage of embedded records with exact cosine scoring


use std::collections::BTreeMap;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::content::RawRecord;
use crate::embeddings::{l2_norm, normalize};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexError {
    #[error("Embedding dimension mismatch for '{title}': index holds {expected}, got {actual}")]
    DimensionMismatch {
        title: String,
        expected: usize,
        actual: usize,
    },

    #[error("Record '{title}' has an empty embedding")]
    EmptyEmbedding { title: String },
}

/// One unit of searchable content
#[derive(Debug, Clone, PartialEq)]
pub struct SearchableRecord {
    source_id: String,
    title: String,
    secondary_text: Vec<String>,
    metadata: Map<String, Value>,
    embedding: Vec<f32>,
}

impl SearchableRecord {
    /// Attach an embedding to a mapped record. The embedding is normalised to unit length.
    #[inline]
    pub fn new(raw: RawRecord, mut embedding: Vec<f32>) -> Self {
        normalize(&mut embedding);
        Self {
            source_id: raw.source_id,
            title: raw.title,
            secondary_text: raw.secondary_text,
            metadata: raw.metadata,
            embedding,
        }
    }

    #[inline]
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    #[inline]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[inline]
    pub fn secondary_text(&self) -> &[String] {
        &self.secondary_text
    }

    #[inline]
    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    #[inline]
    pub fn embedding(&self) -> &[f32] {
        &self.embedding
    }

    /// Stable identifier for in-page navigation, e.g. `blog-distributed-caches`
    #[inline]
    pub fn id(&self) -> String {
        format!("{}-{}", self.source_id, slugify(&self.title))
    }
}

/// Exact-scan vector index. Every record shares the dimension of the first one added.
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    records: Vec<SearchableRecord>,
    dimension: Option<usize>,
}

impl VectorIndex {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add(&mut self, record: SearchableRecord) -> Result<(), IndexError> {
        let actual = record.embedding.len();
        if actual == 0 {
            return Err(IndexError::EmptyEmbedding {
                title: record.title,
            });
        }

        match self.dimension {
            Some(expected) if expected != actual => {
                return Err(IndexError::DimensionMismatch {
                    title: record.title,
                    expected,
                    actual,
                });
            }
            Some(_) => {}
            None => self.dimension = Some(actual),
        }

        self.records.push(record);
        Ok(())
    }

    /// Cosine similarity of `query` against every record, in insertion order
    #[inline]
    pub fn score_all(&self, query: &[f32]) -> Vec<(&SearchableRecord, f32)> {
        self.records
            .iter()
            .map(|record| (record, cosine_similarity(query, &record.embedding)))
            .collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    #[inline]
    pub fn records(&self) -> &[SearchableRecord] {
        &self.records
    }

    /// Number of records per source id
    #[inline]
    pub fn count_by_source(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            *counts.entry(record.source_id.clone()).or_insert(0) += 1;
        }
        counts
    }
}

/// dot(a, b) / (|a| * |b|). Zero for mismatched lengths or zero-length vectors.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let denominator = l2_norm(a) * l2_norm(b);
    if denominator == 0.0 || !denominator.is_finite() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    (dot / denominator).clamp(-1.0, 1.0)
}

fn slugify(text: &str) -> String {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}
