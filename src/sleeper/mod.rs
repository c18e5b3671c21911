//! Sleeper upstream client
//!
//! Stateless read access to the external fantasy-sports API: transactions by
//! week, rosters, users, the full player catalog and the current NFL week.

pub mod client;
pub mod types;

pub use client::{LeagueDataSource, SleeperClient, SleeperError};
pub use types::*;
