//! HTTP client for the coding service.
//!
//! Endpoints (relative to the configured base URL):
//! - POST /cases/analyze
//! - POST /cases/repair
//! - GET  /api/predictions?page&limit[&validated]
//! - GET  /api/predictions/{id}
//! - POST /api/predictions/{id}/feedback
//! - GET  /api/codes/search?q&limit

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use super::{ApiError, CodingApi, PredictionQuery};
use crate::config::normalize_base_url;
use crate::domain::{
    CaseResult, CodeSearchResult, CoderCaseData, FeedbackAck, FeedbackSubmission, PaginatedPredictions,
    Prediction, RepairAck,
};

/// Coding service client
pub struct HttpApi {
    base_url: String,
    client: reqwest::Client,
}

impl HttpApi {
    /// Create a client with a per-request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: normalize_base_url(base_url).unwrap_or_default(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build endpoint URL
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Check status, then decode the body
    async fn read_json<T: DeserializeOwned>(response: reqwest::Response, fallback: &str) -> Result<T, ApiError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "Coding service returned an error");
            let message = if body.trim().is_empty() {
                fallback.to_string()
            } else {
                body
            };
            return Err(ApiError::Http {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl CodingApi for HttpApi {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip_all, fields(text_len = text.len()))]
    async fn analyze(&self, text: &str) -> Result<CaseResult, ApiError> {
        let response = self
            .client
            .post(self.url("/cases/analyze"))
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await?;

        Self::read_json(response, "Failed to analyze text").await
    }

    #[instrument(skip_all)]
    async fn submit_repair(&self, payload: &CoderCaseData) -> Result<RepairAck, ApiError> {
        let response = self
            .client
            .post(self.url("/cases/repair"))
            .json(payload)
            .send()
            .await?;

        Self::read_json(response, "Failed to submit repair").await
    }

    #[instrument(skip(self))]
    async fn list_predictions(&self, query: PredictionQuery) -> Result<PaginatedPredictions, ApiError> {
        let mut params = vec![
            ("page", query.page.to_string()),
            ("limit", query.limit.to_string()),
        ];
        if let Some(validated) = query.validated {
            params.push(("validated", validated.to_string()));
        }

        let response = self
            .client
            .get(self.url("/api/predictions"))
            .query(&params)
            .send()
            .await?;

        Self::read_json(response, "Failed to list predictions").await
    }

    #[instrument(skip(self))]
    async fn get_prediction(&self, id: &str) -> Result<Prediction, ApiError> {
        let response = self
            .client
            .get(self.url(&format!("/api/predictions/{}", id)))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(id.to_string()));
        }

        Self::read_json(response, "Failed to load prediction").await
    }

    #[instrument(skip(self, feedback), fields(feedback_type = feedback.feedback_type.as_str()))]
    async fn submit_feedback(&self, id: &str, feedback: &FeedbackSubmission) -> Result<FeedbackAck, ApiError> {
        let response = self
            .client
            .post(self.url(&format!("/api/predictions/{}/feedback", id)))
            .json(feedback)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(id.to_string()));
        }

        Self::read_json(response, "Failed to submit feedback").await
    }

    #[instrument(skip(self, query), fields(query_len = query.len()))]
    async fn search_codes(&self, query: &str, limit: usize) -> Result<Vec<CodeSearchResult>, ApiError> {
        let response = self
            .client
            .get(self.url("/api/codes/search"))
            .query(&[("q", query.to_string()), ("limit", limit.to_string())])
            .send()
            .await?;

        let results: Vec<CodeSearchResult> = Self::read_json(response, "Failed to search codes").await?;
        debug!(count = results.len(), "Code search returned");
        Ok(results)
    }
}
