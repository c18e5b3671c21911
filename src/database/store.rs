// Analysis Store
//
// Queryable persistence for generated trade analyses, one row per
// transaction id. The sole write path is an idempotent upsert, so the
// discovery job can safely re-run over weeks it has already processed.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;

use crate::analysis::TradeAnalysis;
use crate::database::connection::DatabaseConnection;
use crate::database::models::{FromRow, TradeAnalysisRecord};

/// Durable storage of trade analyses keyed by transaction id.
///
/// The discovery job and HTTP routes depend on this trait; tests substitute
/// an in-memory implementation.
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    /// Fetch a single analysis, `None` when no row exists.
    async fn get(&self, transaction_id: &str) -> Result<Option<TradeAnalysis>>;

    /// Fetch many analyses at once. The result covers every requested id;
    /// ids without a stored row map to `None`, never get omitted.
    async fn get_batch(
        &self,
        transaction_ids: &[String],
    ) -> Result<HashMap<String, Option<TradeAnalysis>>>;

    /// Insert or overwrite the analysis for a transaction. A second call
    /// with the same id replaces the payload and `updated_at` but preserves
    /// the original `created_at`.
    async fn upsert(
        &self,
        transaction_id: &str,
        league_id: &str,
        created_at: i64,
        analysis: &TradeAnalysis,
        version: &str,
    ) -> Result<()>;

    /// Cheap existence pre-check, used before spending a generator call.
    async fn exists(&self, transaction_id: &str) -> Result<bool>;

    /// Most recent analyses for a league, newest first.
    async fn recent_for_league(&self, league_id: &str, limit: i64) -> Result<Vec<TradeAnalysis>>;

    /// Connectivity probe backing the health endpoint.
    async fn health_check(&self) -> Result<()>;
}

fn decode_analysis(record: TradeAnalysisRecord) -> Result<TradeAnalysis> {
    serde_json::from_value(record.analysis_json).with_context(|| {
        format!(
            "Stored analysis for {} is not a valid TradeAnalysis document",
            record.transaction_id
        )
    })
}

#[async_trait]
impl AnalysisStore for DatabaseConnection {
    async fn get(&self, transaction_id: &str) -> Result<Option<TradeAnalysis>> {
        let client = self
            .pool()
            .get()
            .await
            .context("Failed to get DB connection")?;
        let row = client
            .query_opt(
                "SELECT * FROM trade_analysis WHERE transaction_id = $1",
                &[&transaction_id],
            )
            .await
            .context("Failed to query trade analysis")?;

        match row {
            Some(row) => {
                let record = TradeAnalysisRecord::from_row(&row)?;
                Ok(Some(decode_analysis(record)?))
            }
            None => Ok(None),
        }
    }

    async fn get_batch(
        &self,
        transaction_ids: &[String],
    ) -> Result<HashMap<String, Option<TradeAnalysis>>> {
        // Every requested id appears in the result, found or not.
        let mut analyses: HashMap<String, Option<TradeAnalysis>> = transaction_ids
            .iter()
            .map(|id| (id.clone(), None))
            .collect();

        if transaction_ids.is_empty() {
            return Ok(analyses);
        }

        let client = self
            .pool()
            .get()
            .await
            .context("Failed to get DB connection")?;
        let rows = client
            .query(
                "SELECT * FROM trade_analysis WHERE transaction_id = ANY($1)",
                &[&transaction_ids],
            )
            .await
            .context("Failed to query trade analyses batch")?;

        for row in rows {
            let record = TradeAnalysisRecord::from_row(&row)?;
            let id = record.transaction_id.clone();
            analyses.insert(id, Some(decode_analysis(record)?));
        }

        Ok(analyses)
    }

    async fn upsert(
        &self,
        transaction_id: &str,
        league_id: &str,
        created_at: i64,
        analysis: &TradeAnalysis,
        version: &str,
    ) -> Result<()> {
        let client = self
            .pool()
            .get()
            .await
            .context("Failed to get DB connection")?;
        let analysis_json =
            serde_json::to_value(analysis).context("Failed to serialize analysis")?;
        let now = chrono::Utc::now().timestamp_millis();

        client
            .execute(
                "INSERT INTO trade_analysis \
                 (transaction_id, league_id, created_at, analysis_json, analysis_version, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6) \
                 ON CONFLICT (transaction_id) DO UPDATE SET \
                 analysis_json = EXCLUDED.analysis_json, \
                 analysis_version = EXCLUDED.analysis_version, \
                 updated_at = EXCLUDED.updated_at",
                &[
                    &transaction_id,
                    &league_id,
                    &created_at,
                    &analysis_json,
                    &version,
                    &now,
                ],
            )
            .await
            .context("Failed to upsert trade analysis")?;

        Ok(())
    }

    async fn exists(&self, transaction_id: &str) -> Result<bool> {
        let client = self
            .pool()
            .get()
            .await
            .context("Failed to get DB connection")?;
        let row = client
            .query_opt(
                "SELECT 1 FROM trade_analysis WHERE transaction_id = $1 LIMIT 1",
                &[&transaction_id],
            )
            .await
            .context("Failed to check trade analysis existence")?;
        Ok(row.is_some())
    }

    async fn recent_for_league(&self, league_id: &str, limit: i64) -> Result<Vec<TradeAnalysis>> {
        let client = self
            .pool()
            .get()
            .await
            .context("Failed to get DB connection")?;
        let rows = client
            .query(
                "SELECT * FROM trade_analysis WHERE league_id = $1 \
                 ORDER BY created_at DESC LIMIT $2",
                &[&league_id, &limit],
            )
            .await
            .context("Failed to query league analyses")?;

        rows.into_iter()
            .map(|row| decode_analysis(TradeAnalysisRecord::from_row(&row)?))
            .collect()
    }

    async fn health_check(&self) -> Result<()> {
        DatabaseConnection::health_check(self).await
    }
}
