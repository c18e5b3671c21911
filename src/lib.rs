//! # League Worker
//!
//! Companion service for a dynasty fantasy-football fan site. It watches a
//! Sleeper league for newly completed trades, generates a scripted
//! two-analyst commentary for each one via OpenAI, persists the results in
//! PostgreSQL and serves them over a small read-only HTTP API.
//!
//! The crate also ships the client-session stores the site embeds:
//! a durable file cache, the weekly-refreshed players catalog store and the
//! deduplicating trade-analysis fetch store (see [`client`]).
//!
//! ## Architecture
//! - `server`: HTTP server initialization and routing
//! - `config`: environment variable configuration
//! - `routes`: route handlers (health, analysis lookups)
//! - `database`: PostgreSQL pool, models, migrations and the analysis store
//! - `sleeper`: upstream Sleeper API client
//! - `analysis`: the TradeAnalysis document and the OpenAI generator
//! - `cron`: the trade discovery & generation job and its scheduler
//! - `client`: session-side stores for front-end hosts

pub mod analysis;
pub mod client;
pub mod config;
pub mod cron;
pub mod database;
pub mod routes;
pub mod server;
pub mod sleeper;
