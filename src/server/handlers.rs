//! Search gateway endpoint handlers

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::AppState;
use super::errors::ApiError;
use crate::search::{IndexStatus, SearchHit};

/// Query string of `GET /api/search`
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// One search result: display fields plus the similarity score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResultItem {
    pub id: String,
    #[serde(rename = "type")]
    pub source: String,
    pub title: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    pub similarity: f32,
}

const RESERVED_FIELDS: [&str; 4] = ["id", "type", "title", "similarity"];

impl From<&SearchHit<'_>> for SearchResultItem {
    #[inline]
    fn from(hit: &SearchHit<'_>) -> Self {
        let mut fields = hit.record.metadata().clone();
        for key in RESERVED_FIELDS {
            fields.remove(key);
        }

        Self {
            id: hit.record.id(),
            source: hit.record.source_id().to_string(),
            title: hit.record.title().to_string(),
            fields,
            similarity: hit.similarity,
        }
    }
}

/// GET /api/search?q=<text>&limit=<n>
#[inline]
pub async fn search(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Vec<SearchResultItem>>, ApiError> {
    let Query(params) = params.map_err(|rejection| {
        ApiError::new(
            StatusCode::BAD_REQUEST,
            format!("Invalid query parameters: {}", rejection.body_text()),
        )
    })?;
    let query = params.q.unwrap_or_default();
    let limit = params
        .limit
        .unwrap_or(state.service.settings().default_top_k)
        .min(state.max_top_k);

    let hits = state.service.search(&query, Some(limit)).await?;
    debug!("Search '{}' returned {} results", query.trim(), hits.len());

    Ok(Json(hits.iter().map(SearchResultItem::from).collect()))
}

/// GET /api/status
#[inline]
pub async fn status(State(state): State<AppState>) -> Json<IndexStatus> {
    Json(state.service.status())
}
