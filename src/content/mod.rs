//! Content sources
//!
//! Adapters over the portfolio's static content. Each source yields a tagged
//! [`SourcePayload`] which is flattened into [`RawRecord`]s at the ingestion
//! boundary.


use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// A source of searchable content, identified by a stable id such as `"blog"`
#[async_trait]
pub trait ContentSource: Send + Sync {
    fn id(&self) -> &str;

    async fn fetch(&self) -> Result<SourcePayload>;
}

/// The two record shapes the site's adapters produce
#[derive(Debug, Clone, PartialEq)]
pub enum SourcePayload {
    Posts(Vec<BlogPost>),
    Items(Vec<PortfolioItem>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlogPost {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    /// Display-only fields (date, link, thumbnail, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A source record after shape resolution, before embedding
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub source_id: String,
    pub title: String,
    pub secondary_text: Vec<String>,
    pub metadata: Map<String, Value>,
}

impl RawRecord {
    /// Title and secondary text joined by single spaces, blanks skipped
    #[inline]
    pub fn embedding_input(&self) -> String {
        std::iter::once(self.title.as_str())
            .chain(self.secondary_text.iter().map(String::as_str))
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl SourcePayload {
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Self::Posts(posts) => posts.len(),
            Self::Items(items) => items.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Map every record to its searchable fields, tagging it with `source_id`
    #[inline]
    pub fn into_records(self, source_id: &str) -> Vec<RawRecord> {
        match self {
            Self::Posts(posts) => posts
                .into_iter()
                .map(|post| {
                    let mut metadata = post.extra;
                    insert_text(&mut metadata, "excerpt", &post.excerpt);
                    RawRecord {
                        source_id: source_id.to_string(),
                        title: post.title.trim().to_string(),
                        secondary_text: non_empty(vec![post.excerpt]),
                        metadata,
                    }
                })
                .collect(),
            Self::Items(items) => items
                .into_iter()
                .map(|item| {
                    let mut metadata = item.extra;
                    insert_text(&mut metadata, "description", &item.description);
                    insert_text(&mut metadata, "category", &item.category);
                    RawRecord {
                        source_id: source_id.to_string(),
                        title: item.title.trim().to_string(),
                        secondary_text: non_empty(vec![item.description, item.category]),
                        metadata,
                    }
                })
                .collect(),
        }
    }
}

fn insert_text(metadata: &mut Map<String, Value>, key: &str, value: &str) {
    if !value.trim().is_empty() {
        metadata.insert(key.to_string(), Value::String(value.to_string()));
    }
}

fn non_empty(parts: Vec<String>) -> Vec<String> {
    parts
        .into_iter()
        .filter(|part| !part.trim().is_empty())
        .collect()
}

/// Which top-level collection a JSON content file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Posts,
    Items,
}

#[derive(Debug, Deserialize)]
struct PostsFile {
    posts: Vec<BlogPost>,
}

#[derive(Debug, Deserialize)]
struct ItemsFile {
    items: Vec<PortfolioItem>,
}

/// Content source reading one of the site's JSON data files
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    id: String,
    path: PathBuf,
    kind: PayloadKind,
}

impl JsonFileSource {
    #[inline]
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>, kind: PayloadKind) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            kind,
        }
    }

    /// `blog.json` with a top-level `posts` array
    #[inline]
    pub fn blog(data_dir: &Path) -> Self {
        Self::new("blog", data_dir.join("blog.json"), PayloadKind::Posts)
    }

    /// `portfolio.json` with a top-level `items` array
    #[inline]
    pub fn portfolio(data_dir: &Path) -> Self {
        Self::new("portfolio", data_dir.join("portfolio.json"), PayloadKind::Items)
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ContentSource for JsonFileSource {
    #[inline]
    fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    async fn fetch(&self) -> Result<SourcePayload> {
        debug!("Reading content source '{}' from {}", self.id, self.path.display());

        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read content file: {}", self.path.display()))?;

        let payload = match self.kind {
            PayloadKind::Posts => {
                let file: PostsFile = serde_json::from_str(&content).with_context(|| {
                    format!("Failed to parse posts from {}", self.path.display())
                })?;
                SourcePayload::Posts(file.posts)
            }
            PayloadKind::Items => {
                let file: ItemsFile = serde_json::from_str(&content).with_context(|| {
                    format!("Failed to parse items from {}", self.path.display())
                })?;
                SourcePayload::Items(file.items)
            }
        };

        Ok(payload)
    }
}

/// Ordered set of content sources; ingestion walks them in registration order
#[derive(Clone, Default)]
pub struct SourceRegistry {
    sources: Vec<Arc<dyn ContentSource>>,
}

impl SourceRegistry {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// The site's standard sources: blog, then portfolio
    #[inline]
    pub fn from_data_dir(data_dir: &Path) -> Self {
        let mut registry = Self::new();
        registry.register(JsonFileSource::blog(data_dir));
        registry.register(JsonFileSource::portfolio(data_dir));
        registry
    }

    #[inline]
    pub fn register<S>(&mut self, source: S)
    where
        S: ContentSource + 'static,
    {
        self.sources.push(Arc::new(source));
    }

    #[inline]
    pub fn sources(&self) -> &[Arc<dyn ContentSource>] {
        &self.sources
    }

    #[inline]
    pub fn ids(&self) -> Vec<&str> {
        self.sources.iter().map(|source| source.id()).collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl std::fmt::Debug for SourceRegistry {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("sources", &self.ids())
            .finish()
    }
}
