//! Sleeper API client
//!
//! Thin reqwest wrapper over the Sleeper read API. Every endpoint is a plain
//! GET returning JSON; any non-2xx response is an error, never a silent empty
//! result. The one exception is [`LeagueDataSource::current_week`], which
//! falls back to week 1 so a state-endpoint outage cannot abort a job run.

use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::sleeper::types::{NflState, Player, Roster, Transaction, User};

pub const SLEEPER_API_BASE: &str = "https://api.sleeper.app/v1";

#[derive(Debug, Error)]
pub enum SleeperError {
    #[error("request to Sleeper failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Sleeper returned status {status} for {endpoint}")]
    Status {
        endpoint: String,
        status: reqwest::StatusCode,
    },
}

/// Read access to a single league's data on Sleeper.
///
/// The job and the players store depend on this trait rather than on the
/// concrete client so they can run against canned data in tests.
#[async_trait]
pub trait LeagueDataSource: Send + Sync {
    /// All transactions created in the given league week.
    async fn transactions(&self, week: u32) -> Result<Vec<Transaction>, SleeperError>;

    /// Current rosters for the league.
    async fn rosters(&self) -> Result<Vec<Roster>, SleeperError>;

    /// All members of the league.
    async fn users(&self) -> Result<Vec<User>, SleeperError>;

    /// The full player catalog, keyed by player id. Large (several MB);
    /// Sleeper asks that this be fetched sparingly.
    async fn players(&self) -> Result<HashMap<String, Player>, SleeperError>;

    /// Current NFL week, falling back to 1 if the state endpoint fails.
    async fn current_week(&self) -> u32;
}

/// Concrete client against the public Sleeper API.
#[derive(Debug, Clone)]
pub struct SleeperClient {
    client: Client,
    base_url: String,
    league_id: String,
}

impl SleeperClient {
    pub fn new(league_id: String) -> Self {
        Self::with_base_url(league_id, SLEEPER_API_BASE.to_string())
    }

    pub fn with_base_url(league_id: String, base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url,
            league_id,
        }
    }

    pub fn league_id(&self) -> &str {
        &self.league_id
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, SleeperError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(SleeperError::Status {
                endpoint: path.to_string(),
                status: response.status(),
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl LeagueDataSource for SleeperClient {
    async fn transactions(&self, week: u32) -> Result<Vec<Transaction>, SleeperError> {
        self.get_json(&format!(
            "/league/{}/transactions/{}",
            self.league_id, week
        ))
        .await
    }

    async fn rosters(&self) -> Result<Vec<Roster>, SleeperError> {
        self.get_json(&format!("/league/{}/rosters", self.league_id))
            .await
    }

    async fn users(&self) -> Result<Vec<User>, SleeperError> {
        self.get_json(&format!("/league/{}/users", self.league_id))
            .await
    }

    async fn players(&self) -> Result<HashMap<String, Player>, SleeperError> {
        self.get_json("/players/nfl").await
    }

    async fn current_week(&self) -> u32 {
        match self.get_json::<NflState>("/state/nfl").await {
            Ok(state) => state.week.unwrap_or(1),
            Err(e) => {
                warn!("Failed to fetch NFL state, defaulting to week 1: {}", e);
                1
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_kind_check_is_case_insensitive() {
        let tx: Transaction = serde_json::from_value(serde_json::json!({
            "type": "Trade",
            "transaction_id": "123",
            "status": "complete",
            "created": 1700000000000i64
        }))
        .unwrap();
        assert!(tx.is_trade());
    }

    #[test]
    fn transaction_tolerates_missing_optional_fields() {
        let tx: Transaction = serde_json::from_value(serde_json::json!({
            "type": "free_agent",
            "transaction_id": "456",
            "status": "complete",
            "created": 1700000000000i64,
            "unknown_field": {"x": 1}
        }))
        .unwrap();
        assert!(!tx.is_trade());
        assert!(tx.adds.is_none());
        assert!(tx.draft_picks.is_none());
    }

    #[test]
    fn user_team_label_prefers_team_name() {
        let user: User = serde_json::from_value(serde_json::json!({
            "user_id": "u1",
            "username": "handle",
            "display_name": "Display",
            "metadata": {"team_name": "The Juggernauts"}
        }))
        .unwrap();
        assert_eq!(user.team_label(), Some("The Juggernauts"));
    }

    #[test]
    fn user_team_label_falls_back_to_display_name() {
        let user: User = serde_json::from_value(serde_json::json!({
            "user_id": "u1",
            "username": "handle",
            "display_name": "Display"
        }))
        .unwrap();
        assert_eq!(user.team_label(), Some("Display"));
    }
}
