//! Trade discovery & generation job
//!
//! Periodically walks a two-week trailing window of league transactions,
//! finds finalized trades that have no stored analysis yet, generates one
//! commentary document per new trade and persists it with an idempotent
//! upsert. Re-running over already-processed weeks is cheap: the `exists`
//! pre-check skips every trade that already has a row.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

use crate::analysis::AnalysisGenerator;
use crate::database::AnalysisStore;
use crate::sleeper::{LeagueDataSource, Transaction};

/// Status strings Sleeper is known to use for trades that have taken effect.
const COMPLETE_STATUSES: &[&str] = &["complete", "completed"];

/// A trade counts as finalized when its status matches a known-complete
/// value, or when the upstream has stamped a positive status-updated time.
/// The status vocabulary has been observed to vary, so this stays permissive;
/// trades matching neither arm are logged by the caller rather than silently
/// dropped.
fn is_finalized(tx: &Transaction) -> bool {
    if COMPLETE_STATUSES
        .iter()
        .any(|s| tx.status.eq_ignore_ascii_case(s))
    {
        return true;
    }
    matches!(tx.status_updated, Some(ts) if ts > 0)
}

pub struct TradeDiscoveryJob {
    source: Arc<dyn LeagueDataSource>,
    generator: Arc<dyn AnalysisGenerator>,
    store: Arc<dyn AnalysisStore>,
    league_id: String,
    analysis_version: String,
}

impl TradeDiscoveryJob {
    pub fn new(
        source: Arc<dyn LeagueDataSource>,
        generator: Arc<dyn AnalysisGenerator>,
        store: Arc<dyn AnalysisStore>,
        league_id: String,
        analysis_version: String,
    ) -> Self {
        Self {
            source,
            generator,
            store,
            league_id,
            analysis_version,
        }
    }

    /// One discovery pass over the current and previous league week.
    /// Returns the number of newly persisted analyses. Never fails the whole
    /// run: week-level and trade-level errors are logged and skipped.
    pub async fn run_once(&self) -> usize {
        info!("Trade discovery run started");

        let current_week = self.source.current_week().await;
        // Current week first, then the week before, to catch trades whose
        // finalized status lands just after a week boundary.
        let mut weeks = vec![current_week, current_week.saturating_sub(1).max(1)];
        weeks.dedup();

        debug!("Checking weeks: {:?}", weeks);

        let mut total = 0;
        for week in weeks {
            total += self.process_week(week).await;
        }

        info!("Trade discovery run completed, {} new analysis(es)", total);
        total
    }

    async fn process_week(&self, week: u32) -> usize {
        debug!("Processing trades for week {}", week);

        let transactions = match self.source.transactions(week).await {
            Ok(transactions) => transactions,
            Err(e) => {
                error!("Failed to fetch transactions for week {}: {}", week, e);
                return 0;
            }
        };

        let mut trades = Vec::new();
        for tx in transactions.into_iter().filter(Transaction::is_trade) {
            if is_finalized(&tx) {
                trades.push(tx);
            } else {
                warn!(
                    "Skipping trade {} with unrecognized status {:?} (status_updated: {:?})",
                    tx.transaction_id, tx.status, tx.status_updated
                );
            }
        }

        if trades.is_empty() {
            debug!("No finalized trades found for week {}", week);
            return 0;
        }

        info!("Found {} finalized trade(s) for week {}", trades.len(), week);

        // League data is shared across every trade in the week, fetched once.
        let (rosters, users, players) = match tokio::try_join!(
            self.source.rosters(),
            self.source.users(),
            self.source.players(),
        ) {
            Ok(data) => data,
            Err(e) => {
                error!("Failed to fetch league data for week {}: {}", week, e);
                return 0;
            }
        };

        let mut processed = 0;
        for trade in &trades {
            match self.process_trade(trade, &rosters, &users, &players).await {
                Ok(true) => processed += 1,
                Ok(false) => {}
                Err(e) => {
                    // One bad trade never aborts the rest of the run.
                    error!("Error processing trade {}: {:#}", trade.transaction_id, e);
                }
            }
        }

        processed
    }

    /// Returns `Ok(true)` when a new analysis was generated and persisted,
    /// `Ok(false)` when one already existed.
    async fn process_trade(
        &self,
        trade: &Transaction,
        rosters: &[crate::sleeper::Roster],
        users: &[crate::sleeper::User],
        players: &std::collections::HashMap<String, crate::sleeper::Player>,
    ) -> anyhow::Result<bool> {
        if self.store.exists(&trade.transaction_id).await? {
            debug!(
                "Analysis already exists for {}, skipping",
                trade.transaction_id
            );
            return Ok(false);
        }

        info!("Generating analysis for trade {}", trade.transaction_id);

        let analysis = self
            .generator
            .generate(trade, rosters, users, players)
            .await?;

        self.store
            .upsert(
                &trade.transaction_id,
                &self.league_id,
                trade.created,
                &analysis,
                &self.analysis_version,
            )
            .await?;

        info!("Saved analysis for {}", trade.transaction_id);
        Ok(true)
    }

    /// Run the job on a fixed interval until the task is dropped.
    pub async fn start(self: Arc<Self>, period: Duration) {
        info!("Starting trade discovery scheduler, period {:?}", period);

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.run_once().await;
        }
    }
}
