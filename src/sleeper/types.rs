//! Sleeper API response models
//!
//! Typed records for the subset of the Sleeper read API this service consumes:
//! league transactions, rosters, users, the full player catalog and the NFL
//! state endpoint.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A draft pick moving between rosters as part of a trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftPick {
    pub season: String,
    pub round: u8,
    /// Roster the pick originally belonged to.
    pub roster_id: u32,
    pub previous_owner_id: u32,
    /// Roster that holds the pick after the transaction.
    pub owner_id: u32,
}

/// A league transaction (trade, waiver claim, free-agent move, ...).
///
/// Only trades are of interest here, but the endpoint returns every
/// transaction type for the week, so the model stays permissive: most fields
/// are optional and unknown keys are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "type")]
    pub kind: String,
    pub transaction_id: String,
    pub status: String,
    #[serde(default)]
    pub status_updated: Option<i64>,
    /// Rosters participating in the transaction.
    #[serde(default)]
    pub roster_ids: Option<Vec<u32>>,
    /// player_id -> roster_id receiving that player.
    #[serde(default)]
    pub adds: Option<HashMap<String, u32>>,
    /// player_id -> roster_id giving that player up.
    #[serde(default)]
    pub drops: Option<HashMap<String, u32>>,
    #[serde(default)]
    pub draft_picks: Option<Vec<DraftPick>>,
    /// Creation time, epoch milliseconds.
    pub created: i64,
}

impl Transaction {
    pub fn is_trade(&self) -> bool {
        self.kind.eq_ignore_ascii_case("trade")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RosterSettings {
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub losses: u32,
    #[serde(default)]
    pub ties: u32,
    #[serde(default)]
    pub fpts: f64,
}

/// A team's roster: held players plus season record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Roster {
    pub roster_id: u32,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub players: Option<Vec<String>>,
    #[serde(default)]
    pub settings: RosterSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default)]
    pub team_name: Option<String>,
}

/// A league member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub metadata: Option<UserMetadata>,
}

impl User {
    /// Preferred display label: custom team name, then display name, then
    /// username.
    pub fn team_label(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.team_name.as_deref())
            .or(self.display_name.as_deref())
            .or(self.username.as_deref())
    }
}

/// One entry of the full player catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    #[serde(default)]
    pub player_id: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    /// NFL team abbreviation; `None` for free agents.
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub age: Option<u8>,
}

impl Player {
    /// Best-effort display name: `full_name`, or first + last joined.
    pub fn display_name(&self) -> Option<String> {
        if let Some(name) = &self.full_name {
            return Some(name.clone());
        }
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => Some(format!("{} {}", first, last)),
            _ => None,
        }
    }
}

/// The `/state/nfl` response; carries the current league week.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NflState {
    #[serde(default)]
    pub week: Option<u32>,
    #[serde(default)]
    pub season: Option<String>,
    #[serde(default)]
    pub season_type: Option<String>,
}
