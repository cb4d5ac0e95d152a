//! HTTP error responses
//!
//! Every failure leaves the gateway as `{ "error": "<message>" }` with a status
//! code that tells client errors, retryable conditions and server faults apart.

use std::any::Any;

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

use crate::search::QueryError;

pub const MISSING_QUERY_MESSAGE: &str = "Query parameter \"q\" is required.";
pub const NOT_READY_MESSAGE: &str = "Search is not ready yet.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// An error response: status code plus message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    retry_after_secs: Option<u32>,
}

impl ApiError {
    #[inline]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            retry_after_secs: None,
        }
    }

    #[inline]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    fn with_retry_after(mut self, secs: u32) -> Self {
        self.retry_after_secs = Some(secs);
        self
    }
}

impl From<QueryError> for ApiError {
    #[inline]
    fn from(error: QueryError) -> Self {
        match error {
            QueryError::EmptyQuery => Self::new(StatusCode::BAD_REQUEST, MISSING_QUERY_MESSAGE),
            QueryError::NotReady => {
                Self::new(StatusCode::SERVICE_UNAVAILABLE, NOT_READY_MESSAGE).with_retry_after(1)
            }
            QueryError::EmbeddingUnavailable(_) => {
                Self::new(StatusCode::SERVICE_UNAVAILABLE, error.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    #[inline]
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("Request failed ({}): {}", self.status, self.message);
        }

        let mut response = (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response();

        if let Some(secs) = self.retry_after_secs {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }

        response
    }
}

/// Converts a handler panic into a JSON 500
#[inline]
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!("Handler panicked: {}", detail);

    ApiError::internal("Internal server error").into_response()
}
