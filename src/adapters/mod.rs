//! Adapter interfaces for the remote coding service.
//!
//! Views and the CLI talk to the service through [`CodingApi`]. Two
//! implementations exist: [`HttpApi`] for a configured base URL and
//! [`MockApi`], an in-process stand-in used when none is set.

pub mod http;
pub mod mock;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::config::ResolvedConfig;
use crate::domain::{
    CaseResult, CodeSearchResult, CoderCaseData, FeedbackAck, FeedbackSubmission, PaginatedPredictions,
    Prediction, RepairAck,
};

pub use http::HttpApi;
pub use mock::MockApi;

/// Remote service failures
#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-2xx response; `message` is the body text or a per-call fallback
    #[error("{message} (HTTP {status})")]
    Http { status: u16, message: String },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Prediction not found: {0}")]
    NotFound(String),
}

/// Prediction list request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictionQuery {
    /// 1-based page
    pub page: u32,
    pub limit: u32,
    /// Only validated (`Some(true)`) or pending (`Some(false)`) rows
    pub validated: Option<bool>,
}

impl Default for PredictionQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 50,
            validated: None,
        }
    }
}

/// Trait for the coding service
#[async_trait]
pub trait CodingApi: Send + Sync {
    /// Human-readable backend name
    fn name(&self) -> &str;

    /// Analyze clinical text
    async fn analyze(&self, text: &str) -> Result<CaseResult, ApiError>;

    /// Send a whole repaired case record
    async fn submit_repair(&self, payload: &CoderCaseData) -> Result<RepairAck, ApiError>;

    async fn list_predictions(&self, query: PredictionQuery) -> Result<PaginatedPredictions, ApiError>;

    async fn get_prediction(&self, id: &str) -> Result<Prediction, ApiError>;

    async fn submit_feedback(&self, id: &str, feedback: &FeedbackSubmission) -> Result<FeedbackAck, ApiError>;

    /// Search diagnosis codes by code or name
    async fn search_codes(&self, query: &str, limit: usize) -> Result<Vec<CodeSearchResult>, ApiError>;
}

#[async_trait]
impl<T: CodingApi + ?Sized> CodingApi for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn analyze(&self, text: &str) -> Result<CaseResult, ApiError> {
        (**self).analyze(text).await
    }

    async fn submit_repair(&self, payload: &CoderCaseData) -> Result<RepairAck, ApiError> {
        (**self).submit_repair(payload).await
    }

    async fn list_predictions(&self, query: PredictionQuery) -> Result<PaginatedPredictions, ApiError> {
        (**self).list_predictions(query).await
    }

    async fn get_prediction(&self, id: &str) -> Result<Prediction, ApiError> {
        (**self).get_prediction(id).await
    }

    async fn submit_feedback(&self, id: &str, feedback: &FeedbackSubmission) -> Result<FeedbackAck, ApiError> {
        (**self).submit_feedback(id, feedback).await
    }

    async fn search_codes(&self, query: &str, limit: usize) -> Result<Vec<CodeSearchResult>, ApiError> {
        (**self).search_codes(query, limit).await
    }
}

/// Pick the backend: HTTP when a base URL is configured, otherwise the mock
pub fn backend_from_config(config: &ResolvedConfig) -> Result<Arc<dyn CodingApi>, ApiError> {
    match config.api.base_url.as_deref() {
        Some(base_url) => {
            info!(base_url, "Using HTTP coding service");
            Ok(Arc::new(HttpApi::new(base_url, config.api.timeout())?))
        }
        None => {
            info!("No API URL configured, using local mock backend");
            Ok(Arc::new(MockApi::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_selection() {
        let mut config = ResolvedConfig::with_home("/tmp/drgcoder-test");
        assert_eq!(backend_from_config(&config).unwrap().name(), "mock");

        config.api.base_url = Some("http://localhost:8000".to_string());
        assert_eq!(backend_from_config(&config).unwrap().name(), "http");
    }

    #[test]
    fn test_http_error_display() {
        let err = ApiError::Http {
            status: 500,
            message: "Failed to submit repair".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to submit repair (HTTP 500)");
    }
}
