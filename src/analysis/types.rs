//! Trade analysis model
//!
//! The generated commentary document: one letter grade and summary per side,
//! a two-analyst dialogue and a one-sentence verdict. The JSON shape here is
//! the wire format stored in the database and served by the HTTP API, so the
//! field names are part of the external contract.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("OpenAI request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("OpenAI API error {status}: {body}")]
    Api { status: reqwest::StatusCode, body: String },
    #[error("no content in OpenAI response")]
    MissingContent,
    #[error("generated analysis did not match the expected shape: {0}")]
    Schema(#[from] serde_json::Error),
}

/// The two fixed commentary voices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Speaker {
    Mike,
    Jim,
}

/// One turn of the analysts' conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueLine {
    pub speaker: Speaker,
    pub text: String,
}

/// A player one side received in the trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceivedPlayer {
    pub name: String,
    pub position: String,
    /// NFL team abbreviation, `None` for free agents.
    pub team: Option<String>,
}

/// A draft pick one side received in the trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceivedPick {
    pub season: String,
    pub round: u8,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReceivedAssets {
    pub players: Vec<ReceivedPlayer>,
    pub picks: Vec<ReceivedPick>,
}

/// Verdict on one side of the trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamVerdict {
    #[serde(rename = "teamName")]
    pub team_name: String,
    /// Letter grade, A+ through F.
    pub grade: String,
    pub received: ReceivedAssets,
    pub summary: String,
}

/// The full generated analysis for one trade, keyed by transaction id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeAnalysis {
    pub transaction_id: String,
    /// When the analysis was generated, epoch milliseconds.
    pub timestamp: i64,
    /// Keyed by roster id (as a string, matching the stored JSON).
    pub teams: HashMap<String, TeamVerdict>,
    pub conversation: Vec<DialogueLine>,
    pub overall_take: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> serde_json::Value {
        serde_json::json!({
            "transaction_id": "T1",
            "timestamp": 1700000000000i64,
            "teams": {
                "1": {
                    "teamName": "The Juggernauts",
                    "grade": "B+",
                    "received": {
                        "players": [
                            {"name": "P. Example", "position": "WR", "team": "DAL"}
                        ],
                        "picks": []
                    },
                    "summary": "Got the best player in the deal."
                },
                "2": {
                    "teamName": "Rebuild City",
                    "grade": "C",
                    "received": {
                        "players": [],
                        "picks": [{"season": "2026", "round": 1}]
                    },
                    "summary": "Betting on the future."
                }
            },
            "conversation": [
                {"speaker": "Mike", "text": "Bold move."},
                {"speaker": "Jim", "text": "Bold is one word for it."}
            ],
            "overall_take": "A classic win-now versus win-later swap."
        })
    }

    #[test]
    fn round_trips_through_wire_format() {
        let analysis: TradeAnalysis = serde_json::from_value(sample_json()).unwrap();
        assert_eq!(analysis.transaction_id, "T1");
        assert_eq!(analysis.teams["1"].grade, "B+");
        assert_eq!(analysis.conversation[0].speaker, Speaker::Mike);

        let value = serde_json::to_value(&analysis).unwrap();
        assert_eq!(value["teams"]["1"]["teamName"], "The Juggernauts");
        assert_eq!(value["conversation"][1]["speaker"], "Jim");
    }

    #[test]
    fn rejects_unknown_speaker() {
        let mut json = sample_json();
        json["conversation"][0]["speaker"] = serde_json::json!("Bob");
        assert!(serde_json::from_value::<TradeAnalysis>(json).is_err());
    }
}
