//! Trade analysis fetch coordinator
//!
//! Session-side lookup of generated analyses from the worker API. Each
//! transaction id moves through a small state machine: never requested,
//! pending, resolved with an analysis, or resolved-absent with a retry
//! cool-down. "Absent" is an expected outcome while the discovery job has
//! not caught up with a trade yet, so it schedules a retry instead of
//! surfacing an error. Re-render storms collapse into at most one network
//! call per id per retry window.

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use reqwest::Client;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::analysis::TradeAnalysis;

/// Cool-down before an id with no stored analysis is asked for again.
pub const RETRY_DELAY_MS: i64 = 60_000;

#[derive(Debug, Error)]
pub enum WorkerApiError {
    #[error("request to worker API failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("worker API returned status {0}")]
    Status(reqwest::StatusCode),
}

/// HTTP access to the worker's analysis endpoints.
#[async_trait]
pub trait WorkerApi: Send + Sync {
    /// Single lookup; `Ok(None)` means the analysis does not exist yet.
    async fn fetch_one(
        &self,
        transaction_id: &str,
    ) -> Result<Option<TradeAnalysis>, WorkerApiError>;

    /// Batched lookup; the response maps every requested id to its analysis
    /// or null.
    async fn fetch_batch(
        &self,
        transaction_ids: &[String],
    ) -> Result<HashMap<String, Option<TradeAnalysis>>, WorkerApiError>;
}

/// Reqwest-backed client for the worker API.
#[derive(Debug, Clone)]
pub struct WorkerApiClient {
    client: Client,
    base_url: String,
}

impl WorkerApiClient {
    pub fn new(base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, base_url }
    }
}

#[async_trait]
impl WorkerApi for WorkerApiClient {
    async fn fetch_one(
        &self,
        transaction_id: &str,
    ) -> Result<Option<TradeAnalysis>, WorkerApiError> {
        let response = self
            .client
            .get(format!("{}/api/trade-analysis", self.base_url))
            .query(&[("transaction_id", transaction_id)])
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(WorkerApiError::Status(response.status()));
        }

        Ok(Some(response.json().await?))
    }

    async fn fetch_batch(
        &self,
        transaction_ids: &[String],
    ) -> Result<HashMap<String, Option<TradeAnalysis>>, WorkerApiError> {
        let response = self
            .client
            .get(format!("{}/api/trade-analyses", self.base_url))
            .query(&[("ids", transaction_ids.join(","))])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(WorkerApiError::Status(response.status()));
        }

        Ok(response.json().await?)
    }
}

/// One logical instance per running session; construct it once and share it.
pub struct TradeAnalysisStore {
    api: Arc<dyn WorkerApi>,
    /// Resolved states: `Some` = analysis on hand, `None` = checked, absent.
    analyses: DashMap<String, Option<TradeAnalysis>>,
    /// Ids with a lookup in flight.
    pending: DashSet<String>,
    /// Earliest time (epoch ms) a resolved-absent id may be asked for again.
    next_retry_at: DashMap<String, i64>,
    error: Mutex<Option<String>>,
}

impl TradeAnalysisStore {
    pub fn new(api: Arc<dyn WorkerApi>) -> Self {
        Self {
            api,
            analyses: DashMap::new(),
            pending: DashSet::new(),
            next_retry_at: DashMap::new(),
            error: Mutex::new(None),
        }
    }

    fn retry_due(&self, transaction_id: &str, now: i64) -> bool {
        self.next_retry_at
            .get(transaction_id)
            .map(|at| now >= *at)
            .unwrap_or(true)
    }

    /// Whether a lookup is warranted for this id right now: not already
    /// resolved with an analysis, and past any retry cool-down. Pending ids
    /// are filtered by [`Self::claim`], not here.
    fn needs_lookup(&self, transaction_id: &str, now: i64) -> bool {
        match self.analyses.get(transaction_id) {
            Some(entry) => entry.is_none() && self.retry_due(transaction_id, now),
            None => true,
        }
    }

    /// Atomically mark an id pending. Returns false when another caller
    /// already holds the claim, so concurrent requests for the same id
    /// collapse into a single outbound lookup.
    fn claim(&self, transaction_id: &str) -> bool {
        self.pending.insert(transaction_id.to_string())
    }

    fn record_result(&self, transaction_id: String, result: Option<TradeAnalysis>, now: i64) {
        match result {
            Some(analysis) => {
                self.next_retry_at.remove(&transaction_id);
                self.analyses.insert(transaction_id, Some(analysis));
            }
            None => {
                // Not an error: the job just hasn't processed this trade yet.
                self.next_retry_at
                    .insert(transaction_id.clone(), now + RETRY_DELAY_MS);
                self.analyses.insert(transaction_id, None);
            }
        }
    }

    /// Roll ids back to never-requested after a failed lookup, so the next
    /// request retries immediately without a cool-down.
    fn roll_back(&self, transaction_ids: &[String]) {
        for id in transaction_ids {
            self.analyses.remove(id);
            self.next_retry_at.remove(id);
        }
    }

    /// Fetch the analysis for one trade, unless it is already pending,
    /// resolved, or inside its retry cool-down.
    pub async fn request_one(&self, transaction_id: &str) {
        let now = chrono::Utc::now().timestamp_millis();
        if !self.needs_lookup(transaction_id, now) || !self.claim(transaction_id) {
            return;
        }

        *self.error.lock().unwrap() = None;

        let result = self.api.fetch_one(transaction_id).await;

        let now = chrono::Utc::now().timestamp_millis();
        match result {
            Ok(result) => self.record_result(transaction_id.to_string(), result, now),
            Err(e) => {
                debug!("Analysis lookup failed for {}: {}", transaction_id, e);
                *self.error.lock().unwrap() = Some(e.to_string());
                self.roll_back(&[transaction_id.to_string()]);
            }
        }

        self.pending.remove(transaction_id);
    }

    /// Fetch analyses for a set of trades in one batched call, skipping ids
    /// that need no lookup right now.
    pub async fn request_batch(&self, transaction_ids: &[String]) {
        let now = chrono::Utc::now().timestamp_millis();

        // The claim doubles as dedup: a second occurrence of the same id
        // fails to claim and drops out.
        let mut to_fetch = Vec::new();
        for id in transaction_ids {
            if self.needs_lookup(id, now) && self.claim(id) {
                to_fetch.push(id.clone());
            }
        }
        if to_fetch.is_empty() {
            return;
        }

        *self.error.lock().unwrap() = None;

        let result = self.api.fetch_batch(&to_fetch).await;

        let now = chrono::Utc::now().timestamp_millis();
        match result {
            Ok(results) => {
                for (id, analysis) in results {
                    self.record_result(id, analysis, now);
                }
            }
            Err(e) => {
                debug!("Batched analysis lookup failed: {}", e);
                *self.error.lock().unwrap() = Some(e.to_string());
                self.roll_back(&to_fetch);
            }
        }

        for id in &to_fetch {
            self.pending.remove(id);
        }
    }

    /// Resolved state for an id: outer `None` = never checked, inner `None`
    /// = checked and absent.
    pub fn analysis(&self, transaction_id: &str) -> Option<Option<TradeAnalysis>> {
        self.analyses
            .get(transaction_id)
            .map(|entry| entry.value().clone())
    }

    pub fn is_pending(&self, transaction_id: &str) -> bool {
        self.pending.contains(transaction_id)
    }

    pub fn last_error(&self) -> Option<String> {
        self.error.lock().unwrap().clone()
    }

    pub fn reset(&self) {
        self.analyses.clear();
        self.pending.clear();
        self.next_retry_at.clear();
        *self.error.lock().unwrap() = None;
    }

    #[cfg(test)]
    fn set_next_retry_at(&self, transaction_id: &str, at: i64) {
        self.next_retry_at.insert(transaction_id.to_string(), at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{DialogueLine, Speaker};

    fn analysis_for(id: &str) -> TradeAnalysis {
        TradeAnalysis {
            transaction_id: id.to_string(),
            timestamp: 1700000100000,
            teams: HashMap::new(),
            conversation: vec![DialogueLine {
                speaker: Speaker::Jim,
                text: "Take.".to_string(),
            }],
            overall_take: "Fine trade.".to_string(),
        }
    }

    /// Scripted API double: ids listed in `present` resolve with an
    /// analysis, everything else resolves absent; `fail` makes every call
    /// error. Records the ids of every outbound call.
    #[derive(Default)]
    struct FakeApi {
        present: Vec<String>,
        fail: bool,
        /// Hold each lookup open briefly so calls can overlap.
        slow: bool,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl FakeApi {
        fn with_present(ids: &[&str]) -> Self {
            Self {
                present: ids.iter().map(|s| s.to_string()).collect(),
                ..Self::default()
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }

        fn lookup(&self, id: &str) -> Option<TradeAnalysis> {
            self.present
                .iter()
                .any(|p| p == id)
                .then(|| analysis_for(id))
        }
    }

    #[async_trait]
    impl WorkerApi for FakeApi {
        async fn fetch_one(
            &self,
            transaction_id: &str,
        ) -> Result<Option<TradeAnalysis>, WorkerApiError> {
            self.calls
                .lock()
                .unwrap()
                .push(vec![transaction_id.to_string()]);
            if self.slow {
                tokio::time::sleep(Duration::from_millis(25)).await;
            }
            if self.fail {
                return Err(WorkerApiError::Status(
                    reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                ));
            }
            Ok(self.lookup(transaction_id))
        }

        async fn fetch_batch(
            &self,
            transaction_ids: &[String],
        ) -> Result<HashMap<String, Option<TradeAnalysis>>, WorkerApiError> {
            self.calls.lock().unwrap().push(transaction_ids.to_vec());
            if self.fail {
                return Err(WorkerApiError::Status(
                    reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                ));
            }
            Ok(transaction_ids
                .iter()
                .map(|id| (id.clone(), self.lookup(id)))
                .collect())
        }
    }

    #[tokio::test]
    async fn resolves_present_analysis() {
        let api = Arc::new(FakeApi::with_present(&["T1"]));
        let store = TradeAnalysisStore::new(api.clone());

        store.request_one("T1").await;

        let resolved = store.analysis("T1").unwrap().unwrap();
        assert_eq!(resolved.transaction_id, "T1");
        assert!(!store.is_pending("T1"));
        assert!(store.last_error().is_none());
    }

    #[tokio::test]
    async fn resolved_present_is_never_refetched() {
        let api = Arc::new(FakeApi::with_present(&["T1"]));
        let store = TradeAnalysisStore::new(api.clone());

        store.request_one("T1").await;
        store.request_one("T1").await;
        store.request_one("T1").await;

        assert_eq!(api.calls().len(), 1);
    }

    #[tokio::test]
    async fn not_found_schedules_retry_without_error() {
        let api = Arc::new(FakeApi::default());
        let store = TradeAnalysisStore::new(api.clone());

        store.request_one("T1").await;

        // Checked and absent, not an error.
        assert!(store.analysis("T1").unwrap().is_none());
        assert!(store.last_error().is_none());

        // Inside the cool-down: no network call.
        store.request_one("T1").await;
        assert_eq!(api.calls().len(), 1);

        // Cool-down elapsed: exactly one new call.
        store.set_next_retry_at("T1", chrono::Utc::now().timestamp_millis() - 1);
        store.request_one("T1").await;
        assert_eq!(api.calls().len(), 2);
    }

    #[tokio::test]
    async fn not_found_retry_is_scheduled_a_minute_out() {
        let api = Arc::new(FakeApi::default());
        let store = TradeAnalysisStore::new(api);

        let before = chrono::Utc::now().timestamp_millis();
        store.request_one("T1").await;
        let after = chrono::Utc::now().timestamp_millis();

        let at = *store.next_retry_at.get("T1").unwrap();
        assert!(at >= before + RETRY_DELAY_MS && at <= after + RETRY_DELAY_MS);
    }

    #[tokio::test]
    async fn batch_requests_only_ids_that_need_fetching() {
        let api = Arc::new(FakeApi::with_present(&["a", "c"]));
        let store = TradeAnalysisStore::new(api.clone());

        // `a` already resolved-present, `b` currently pending.
        store.request_one("a").await;
        store.pending.insert("b".to_string());

        store
            .request_batch(&["a".to_string(), "b".to_string(), "c".to_string()])
            .await;

        let calls = api.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1], vec!["c".to_string()]);
        assert!(store.analysis("c").unwrap().is_some());
    }

    #[tokio::test]
    async fn pending_id_is_never_refetched() {
        let api = Arc::new(FakeApi::with_present(&["T1"]));
        let store = TradeAnalysisStore::new(api.clone());
        store.pending.insert("T1".to_string());

        store.request_one("T1").await;

        assert!(api.calls().is_empty());
        assert!(store.analysis("T1").is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_for_one_id_collapse_into_one_call() {
        let api = Arc::new(FakeApi {
            present: vec!["T1".to_string()],
            slow: true,
            ..FakeApi::default()
        });
        let store = Arc::new(TradeAnalysisStore::new(api.clone()));

        let tasks: Vec<_> = (0..5)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.request_one("T1").await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        // Only the task holding the pending claim reaches the network.
        assert_eq!(api.calls().len(), 1);
    }

    #[tokio::test]
    async fn batch_deduplicates_requested_ids() {
        let api = Arc::new(FakeApi::default());
        let store = TradeAnalysisStore::new(api.clone());

        store
            .request_batch(&["x".to_string(), "x".to_string(), "y".to_string()])
            .await;

        assert_eq!(api.calls()[0], vec!["x".to_string(), "y".to_string()]);
    }

    #[tokio::test]
    async fn batch_with_nothing_to_fetch_issues_no_call() {
        let api = Arc::new(FakeApi::with_present(&["a"]));
        let store = TradeAnalysisStore::new(api.clone());
        store.request_one("a").await;

        store.request_batch(&["a".to_string()]).await;

        assert_eq!(api.calls().len(), 1);
    }

    #[tokio::test]
    async fn batch_records_absent_ids_with_cooldown() {
        let api = Arc::new(FakeApi::with_present(&["a"]));
        let store = TradeAnalysisStore::new(api.clone());

        store
            .request_batch(&["a".to_string(), "b".to_string()])
            .await;

        assert!(store.analysis("a").unwrap().is_some());
        assert!(store.analysis("b").unwrap().is_none());
        assert!(store.next_retry_at.contains_key("b"));

        // The absent id is inside its cool-down now.
        store.request_batch(&["b".to_string()]).await;
        assert_eq!(api.calls().len(), 1);
    }

    #[tokio::test]
    async fn failure_records_error_and_rolls_back_to_absent() {
        let api = Arc::new(FakeApi::failing());
        let store = TradeAnalysisStore::new(api.clone());

        store.request_one("T1").await;

        assert!(store.last_error().is_some());
        assert!(store.analysis("T1").is_none());
        assert!(!store.is_pending("T1"));

        // No cool-down after a failure: the next request goes out at once.
        store.request_one("T1").await;
        assert_eq!(api.calls().len(), 2);
    }

    #[tokio::test]
    async fn reset_clears_all_session_state() {
        let api = Arc::new(FakeApi::with_present(&["a"]));
        let store = TradeAnalysisStore::new(api.clone());
        store
            .request_batch(&["a".to_string(), "b".to_string()])
            .await;

        store.reset();

        assert!(store.analysis("a").is_none());
        assert!(store.analysis("b").is_none());
        assert!(store.last_error().is_none());

        // Everything is fetchable again.
        store.request_one("a").await;
        assert_eq!(api.calls().len(), 2);
    }
}
