//! Debounced code search with last-query-wins.
//!
//! Every query takes a token from a shared [`SearchGate`]. After the debounce
//! interval, and again after the remote call, the token is compared with the
//! latest one issued; anything older is discarded.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument};

use crate::adapters::{ApiError, CodingApi};
use crate::config::SearchSettings;
use crate::domain::CodeSearchResult;

/// Monotonic request generation counter
#[derive(Debug, Clone, Default)]
pub struct SearchGate {
    latest: Arc<AtomicU64>,
}

impl SearchGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new token, superseding all earlier ones
    pub fn issue(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Whether `token` is still the newest
    pub fn is_current(&self, token: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == token
    }

    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }
}

/// What became of one search call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// A newer query arrived during the debounce interval; nothing was sent
    Superseded,
    /// Query shorter than the minimum; nothing was sent
    TooShort,
    /// A newer query arrived while this one was in flight; result dropped
    Stale,
    Results(Vec<CodeSearchResult>),
}

/// Search-as-you-type front end for [`CodingApi::search_codes`]
pub struct CodeSearcher<A> {
    api: A,
    gate: SearchGate,
    debounce: Duration,
    min_query_length: usize,
    limit: usize,
}

impl<A: CodingApi> CodeSearcher<A> {
    pub fn new(api: A, settings: &SearchSettings) -> Self {
        Self {
            api,
            gate: SearchGate::new(),
            debounce: settings.debounce(),
            min_query_length: settings.min_query_length,
            limit: settings.limit,
        }
    }

    pub fn gate(&self) -> &SearchGate {
        &self.gate
    }

    /// Run one keystroke's search
    ///
    /// Errors from a request that has since been superseded are dropped as
    /// `Stale` rather than returned.
    #[instrument(skip(self, query), fields(query_len = query.len()))]
    pub async fn search(&self, query: &str) -> Result<SearchOutcome, ApiError> {
        let token = self.gate.issue();
        tokio::time::sleep(self.debounce).await;

        if !self.gate.is_current(token) {
            debug!(token, "Search superseded during debounce");
            return Ok(SearchOutcome::Superseded);
        }

        let query = query.trim();
        if query.chars().count() < self.min_query_length {
            return Ok(SearchOutcome::TooShort);
        }

        let response = self.api.search_codes(query, self.limit).await;

        if !self.gate.is_current(token) {
            debug!(token, latest = self.gate.latest(), "Dropping stale search response");
            return Ok(SearchOutcome::Stale);
        }

        let mut results = response?;
        results.truncate(self.limit);
        debug!(token, count = results.len(), "Search results ready");
        Ok(SearchOutcome::Results(results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_tokens_increase() {
        let gate = SearchGate::new();
        let first = gate.issue();
        let second = gate.clone().issue();
        assert!(second > first);
        assert!(!gate.is_current(first));
        assert!(gate.is_current(second));
    }
}
