//! Database Migrations
//!
//! The schema is a single table, so migrations are idempotent DDL run at
//! startup rather than a versioned migration directory.

use anyhow::{Context, Result};
use deadpool_postgres::Pool;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS trade_analysis (
        transaction_id   TEXT PRIMARY KEY,
        league_id        TEXT NOT NULL,
        created_at       BIGINT NOT NULL,
        analysis_json    JSONB NOT NULL,
        analysis_version TEXT NOT NULL,
        updated_at       BIGINT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_trade_analysis_league \
     ON trade_analysis (league_id, created_at DESC)",
];

/// Run all pending migrations
pub async fn run_migrations(pool: &Pool) -> Result<()> {
    tracing::info!("Running database migrations...");

    let client = pool
        .get()
        .await
        .context("Failed to get connection for migrations")?;

    for statement in SCHEMA {
        client
            .execute(*statement, &[])
            .await
            .with_context(|| format!("Migration statement failed: {}", statement))?;
    }

    tracing::info!("Database migrations completed");
    Ok(())
}
