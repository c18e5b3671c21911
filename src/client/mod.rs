//! Client-session stores
//!
//! The pieces a front-end host embeds: the durable file cache, the players
//! reference-data store and the trade-analysis fetch store. Each is meant to
//! be constructed once per session and passed down explicitly.

pub mod analyses;
pub mod cache;
pub mod players;

pub use analyses::{TradeAnalysisStore, WorkerApi, WorkerApiClient, WorkerApiError};
pub use cache::CacheStore;
pub use players::PlayersStore;
