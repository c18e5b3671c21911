// Database Models
//
// Tokio-postgres compatible models for the trade-analysis table.

use serde::{Deserialize, Serialize};

/// Conversion from a tokio-postgres row into a typed model.
pub trait FromRow: Sized {
    fn from_row(row: &tokio_postgres::Row) -> Result<Self, tokio_postgres::Error>;
}

/// One stored trade analysis, exactly as persisted.
///
/// `analysis_json` holds the serialized [`crate::analysis::TradeAnalysis`]
/// document; `created_at` is the trade's creation time (epoch ms) and is
/// never touched after the first insert, while `updated_at` moves on every
/// regeneration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeAnalysisRecord {
    pub transaction_id: String,
    pub league_id: String,
    pub created_at: i64,
    pub analysis_json: serde_json::Value,
    pub analysis_version: String,
    pub updated_at: i64,
}

impl FromRow for TradeAnalysisRecord {
    fn from_row(row: &tokio_postgres::Row) -> Result<Self, tokio_postgres::Error> {
        Ok(Self {
            transaction_id: row.try_get("transaction_id")?,
            league_id: row.try_get("league_id")?,
            created_at: row.try_get("created_at")?,
            analysis_json: row.try_get("analysis_json")?,
            analysis_version: row.try_get("analysis_version")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}
