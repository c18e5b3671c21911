//! Players store
//!
//! Session-wide manager for the player catalog, the large reference dataset
//! behind every roster and trade rendering. Sleeper asks that the catalog
//! endpoint be hit sparingly, so the store serves from memory while the data
//! is less than a week old, hydrates from the durable cache on first use and
//! writes fresh fetches back through it. Lookups never fail; unknown ids get
//! readable fallbacks.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::RwLock;
use tracing::{debug, info, warn};

use crate::client::cache::CacheStore;
use crate::sleeper::client::LeagueDataSource;
use crate::sleeper::types::Player;

const PLAYERS_CACHE_KEY: &str = "players";
const CACHE_DURATION_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// Marker returned for players without an NFL team, and for unknown ids.
const FREE_AGENT: &str = "FA";

#[derive(Default)]
struct PlayersState {
    players: Arc<HashMap<String, Player>>,
    last_fetch: Option<i64>,
    hydrated: bool,
    is_loading: bool,
    error: Option<String>,
}

/// One logical instance per running session; construct it once and share it.
pub struct PlayersStore {
    source: Arc<dyn LeagueDataSource>,
    cache: CacheStore,
    state: RwLock<PlayersState>,
    // Serializes loads so concurrent ensure_loaded calls coalesce into a
    // single upstream fetch.
    load_lock: tokio::sync::Mutex<()>,
}

impl PlayersStore {
    pub fn new(source: Arc<dyn LeagueDataSource>, cache: CacheStore) -> Self {
        Self {
            source,
            cache,
            state: RwLock::new(PlayersState::default()),
            load_lock: tokio::sync::Mutex::new(()),
        }
    }

    fn is_fresh(&self, now: i64) -> bool {
        let state = self.state.read().unwrap();
        match state.last_fetch {
            Some(last_fetch) => {
                now - last_fetch < CACHE_DURATION_MS && !state.players.is_empty()
            }
            None => false,
        }
    }

    /// Load the catalog if needed. Serves from memory when the data is fresh
    /// (< 7 days) and non-empty, otherwise fetches from Sleeper, swaps the
    /// in-memory map atomically and writes through to the durable cache in
    /// the background. Safe to call concurrently: waiters coalesce behind a
    /// single fetch and return once it lands.
    pub async fn ensure_loaded(&self, force_refresh: bool) {
        let _guard = self.load_lock.lock().await;

        if !self.state.read().unwrap().hydrated {
            self.hydrate_from_cache().await;
        }

        // Re-checked under the lock: a concurrent caller may have just
        // finished the fetch for us.
        if !force_refresh && self.is_fresh(chrono::Utc::now().timestamp_millis()) {
            return;
        }

        {
            let mut state = self.state.write().unwrap();
            state.is_loading = true;
            state.error = None;
        }

        match self.source.players().await {
            Ok(players) => {
                let now = chrono::Utc::now().timestamp_millis();
                let players = Arc::new(players);
                {
                    let mut state = self.state.write().unwrap();
                    state.players = players.clone();
                    state.last_fetch = Some(now);
                    state.is_loading = false;
                }
                info!("Loaded {} players from Sleeper", players.len());

                // Write-through is off the critical path; a failure only
                // costs a refetch next session.
                let cache = self.cache.clone();
                tokio::spawn(async move {
                    if !cache.set(PLAYERS_CACHE_KEY, players.as_ref(), now).await {
                        warn!("Player cache write-through failed");
                    }
                });
            }
            Err(e) => {
                // Stale-but-available beats empty: prior data stays in place.
                warn!("Failed to fetch players: {}", e);
                let mut state = self.state.write().unwrap();
                state.error = Some(e.to_string());
                state.is_loading = false;
            }
        }
    }

    async fn hydrate_from_cache(&self) {
        let cached = self
            .cache
            .get::<HashMap<String, Player>>(PLAYERS_CACHE_KEY)
            .await;

        let mut state = self.state.write().unwrap();
        state.hydrated = true;
        if let Some((players, timestamp)) = cached {
            debug!("Hydrated {} players from durable cache", players.len());
            state.players = Arc::new(players);
            state.last_fetch = Some(timestamp);
        }
    }

    /// Look up a player by id.
    pub fn player(&self, player_id: &str) -> Option<Player> {
        self.state.read().unwrap().players.get(player_id).cloned()
    }

    /// Player's display name, falling back to the raw id.
    pub fn player_name(&self, player_id: &str) -> String {
        self.state
            .read()
            .unwrap()
            .players
            .get(player_id)
            .and_then(|p| p.display_name())
            .unwrap_or_else(|| player_id.to_string())
    }

    /// Player's position, or an empty string when unknown.
    pub fn player_position(&self, player_id: &str) -> String {
        self.state
            .read()
            .unwrap()
            .players
            .get(player_id)
            .and_then(|p| p.position.clone())
            .unwrap_or_default()
    }

    /// Player's NFL team abbreviation, or the free-agent marker.
    pub fn player_team(&self, player_id: &str) -> String {
        self.state
            .read()
            .unwrap()
            .players
            .get(player_id)
            .and_then(|p| p.team.clone())
            .unwrap_or_else(|| FREE_AGENT.to_string())
    }

    pub fn is_loading(&self) -> bool {
        self.state.read().unwrap().is_loading
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.read().unwrap().error.clone()
    }

    pub fn len(&self) -> usize {
        self.state.read().unwrap().players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().unwrap().players.is_empty()
    }

    /// Clear session state. The durable cache is left intact so the next
    /// session can still hydrate from it.
    pub fn reset(&self) {
        *self.state.write().unwrap() = PlayersState::default();
    }

    #[cfg(test)]
    fn set_last_fetch(&self, timestamp: i64) {
        self.state.write().unwrap().last_fetch = Some(timestamp);
    }
}
