//! OpenAI trade-analysis generator
//!
//! Builds a textual description of a trade from league data and asks the
//! model for a structured commentary document. The response format is pinned
//! with a strict JSON schema so the output deserializes straight into
//! [`TradeAnalysis`].

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::time::Duration;

use crate::analysis::types::{GenerationError, TradeAnalysis};
use crate::sleeper::types::{Player, Roster, Transaction, User};

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Produces one analysis document per trade.
#[async_trait]
pub trait AnalysisGenerator: Send + Sync {
    async fn generate(
        &self,
        trade: &Transaction,
        rosters: &[Roster],
        users: &[User],
        players: &HashMap<String, Player>,
    ) -> Result<TradeAnalysis, GenerationError>;
}

pub struct OpenAiGenerator {
    client: Client,
    api_key: String,
    model: String,
    temperature: f32,
}

impl OpenAiGenerator {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.8,
        }
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    async fn call_openai(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, GenerationError> {
        let payload = json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": system_prompt
                },
                {
                    "role": "user",
                    "content": user_prompt
                }
            ],
            "temperature": self.temperature,
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "trade_analysis",
                    "strict": true,
                    "schema": analysis_schema()
                }
            }
        });

        let response = self
            .client
            .post(OPENAI_API_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api { status, body });
        }

        let body: Value = response.json().await?;

        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or(GenerationError::MissingContent)?;

        Ok(content.to_string())
    }
}

#[async_trait]
impl AnalysisGenerator for OpenAiGenerator {
    async fn generate(
        &self,
        trade: &Transaction,
        rosters: &[Roster],
        users: &[User],
        players: &HashMap<String, Player>,
    ) -> Result<TradeAnalysis, GenerationError> {
        let context = build_trade_context(trade, rosters, users, players);
        let prompt = build_analysis_prompt(&context);

        let content = self
            .call_openai(
                "You are a fantasy football analyst who provides entertaining, \
                 snarky trade analysis.",
                &prompt,
            )
            .await?;

        Ok(serde_json::from_str(&content)?)
    }
}

/// JSON schema enforced on the model output, mirroring [`TradeAnalysis`].
fn analysis_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "transaction_id": { "type": "string" },
            "timestamp": { "type": "number" },
            "teams": {
                "type": "object",
                "additionalProperties": {
                    "type": "object",
                    "properties": {
                        "teamName": { "type": "string" },
                        "grade": { "type": "string" },
                        "received": {
                            "type": "object",
                            "properties": {
                                "players": {
                                    "type": "array",
                                    "items": {
                                        "type": "object",
                                        "properties": {
                                            "name": { "type": "string" },
                                            "position": { "type": "string" },
                                            "team": { "type": ["string", "null"] }
                                        },
                                        "required": ["name", "position", "team"]
                                    }
                                },
                                "picks": {
                                    "type": "array",
                                    "items": {
                                        "type": "object",
                                        "properties": {
                                            "season": { "type": "string" },
                                            "round": { "type": "number" }
                                        },
                                        "required": ["season", "round"]
                                    }
                                }
                            },
                            "required": ["players", "picks"]
                        },
                        "summary": { "type": "string" }
                    },
                    "required": ["teamName", "grade", "received", "summary"]
                }
            },
            "conversation": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "speaker": { "type": "string", "enum": ["Mike", "Jim"] },
                        "text": { "type": "string" }
                    },
                    "required": ["speaker", "text"]
                }
            },
            "overall_take": { "type": "string" }
        },
        "required": ["transaction_id", "timestamp", "teams", "conversation", "overall_take"]
    })
}

/// Fixed instruction template wrapped around the trade description.
fn build_analysis_prompt(context: &str) -> String {
    format!(
        r#"You are analyzing a fantasy football trade for a dynasty league. Your job is to create an in-depth, snarky analysis written as a conversation between two sports analysts named Mike and Jim.

Trade Details:
{context}

Instructions:
1. Grade each team's side of the trade (A+, A, A-, B+, B, B-, C+, C, C-, D+, D, F)
2. Explain what each team received and why
3. Discuss the immediate impact and long-term implications
4. Write the analysis as a natural conversation between Mike and Jim
5. Be snarky and entertaining (think ESPN's talking heads)
6. Make it 6-10 exchanges between Mike and Jim
7. End with an "overall_take" that summarizes the trade in one sentence

Keep the tone fun and engaging, but provide genuine fantasy football insights. Consider factors like:
- Player age and career trajectory
- Team records and whether they're contending or rebuilding
- Positional needs
- Draft pick value
- Dynasty league context (future value matters!)

Return your analysis in the specified JSON format."#
    )
}

fn team_label(roster_id: u32, rosters: &[Roster], users: &[User]) -> String {
    let fallback = format!("Team {}", roster_id);
    let Some(roster) = rosters.iter().find(|r| r.roster_id == roster_id) else {
        return fallback;
    };
    let Some(owner_id) = roster.owner_id.as_deref() else {
        return fallback;
    };
    users
        .iter()
        .find(|u| u.user_id == owner_id)
        .and_then(|u| u.team_label())
        .map(|label| label.to_string())
        .unwrap_or(fallback)
}

fn player_label(player_id: &str, players: &HashMap<String, Player>) -> String {
    let Some(player) = players.get(player_id) else {
        return format!("Player {}", player_id);
    };
    let name = player
        .display_name()
        .unwrap_or_else(|| format!("Player {}", player_id));
    let position = player.position.as_deref().unwrap_or("?");
    match player.team.as_deref() {
        Some(team) => format!("{} ({} - {})", name, position, team),
        None => format!("{} ({})", name, position),
    }
}

/// Render the trade as text for the generator: each involved team with its
/// record and everything it received, by roster id.
pub fn build_trade_context(
    trade: &Transaction,
    rosters: &[Roster],
    users: &[User],
    players: &HashMap<String, Player>,
) -> String {
    let date = chrono::DateTime::from_timestamp_millis(trade.created)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let mut context = format!(
        "Transaction ID: {}\nDate: {}\n\nTeams involved:\n",
        trade.transaction_id, date
    );

    let empty_picks = Vec::new();
    let picks = trade.draft_picks.as_ref().unwrap_or(&empty_picks);

    for &roster_id in trade.roster_ids.as_deref().unwrap_or(&[]) {
        let label = team_label(roster_id, rosters, users);
        let record = rosters
            .iter()
            .find(|r| r.roster_id == roster_id)
            .map(|r| format!("{}-{}", r.settings.wins, r.settings.losses))
            .unwrap_or_else(|| "N/A".to_string());

        context.push_str(&format!("\n{} ({}):\nReceived:\n", label, record));

        let mut received_anything = false;

        if let Some(adds) = &trade.adds {
            // Sort for a stable rendering; HashMap order is arbitrary.
            let mut added: Vec<_> = adds
                .iter()
                .filter(|&(_, &to)| to == roster_id)
                .map(|(player_id, _)| player_id)
                .collect();
            added.sort();
            for player_id in added {
                context.push_str(&format!("  - {}\n", player_label(player_id, players)));
                received_anything = true;
            }
        }

        for pick in picks.iter().filter(|p| p.owner_id == roster_id) {
            let original = team_label(pick.roster_id, rosters, users);
            context.push_str(&format!(
                "  - {} Round {} Pick (originally {}'s)\n",
                pick.season, pick.round, original
            ));
            received_anything = true;
        }

        if !received_anything {
            context.push_str("  - Nothing\n");
        }
    }

    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sleeper::types::{DraftPick, RosterSettings};

    fn league_fixture() -> (Vec<Roster>, Vec<User>, HashMap<String, Player>) {
        let rosters = vec![
            Roster {
                roster_id: 1,
                owner_id: Some("u1".to_string()),
                players: None,
                settings: RosterSettings {
                    wins: 8,
                    losses: 2,
                    ties: 0,
                    fpts: 1100.0,
                },
            },
            Roster {
                roster_id: 2,
                owner_id: Some("u2".to_string()),
                players: None,
                settings: RosterSettings {
                    wins: 2,
                    losses: 8,
                    ties: 0,
                    fpts: 800.0,
                },
            },
        ];
        let users = vec![
            serde_json::from_value(serde_json::json!({
                "user_id": "u1",
                "display_name": "Alpha",
                "metadata": {"team_name": "Contenders"}
            }))
            .unwrap(),
            serde_json::from_value(serde_json::json!({
                "user_id": "u2",
                "display_name": "Beta"
            }))
            .unwrap(),
        ];
        let mut players = HashMap::new();
        players.insert(
            "P9".to_string(),
            Player {
                player_id: Some("P9".to_string()),
                full_name: Some("Star Receiver".to_string()),
                first_name: None,
                last_name: None,
                position: Some("WR".to_string()),
                team: Some("DAL".to_string()),
                age: Some(25),
            },
        );
        (rosters, users, players)
    }

    fn trade_fixture() -> Transaction {
        Transaction {
            kind: "trade".to_string(),
            transaction_id: "T1".to_string(),
            status: "complete".to_string(),
            status_updated: Some(1700000001000),
            roster_ids: Some(vec![1, 2]),
            adds: Some(HashMap::from([("P9".to_string(), 1u32)])),
            drops: None,
            draft_picks: Some(vec![DraftPick {
                season: "2026".to_string(),
                round: 1,
                roster_id: 1,
                previous_owner_id: 1,
                owner_id: 2,
            }]),
            created: 1700000000000,
        }
    }

    #[test]
    fn context_lists_each_side_and_its_assets() {
        let (rosters, users, players) = league_fixture();
        let context = build_trade_context(&trade_fixture(), &rosters, &users, &players);

        assert!(context.contains("Transaction ID: T1"));
        assert!(context.contains("Contenders (8-2)"));
        assert!(context.contains("Beta (2-8)"));
        assert!(context.contains("Star Receiver (WR - DAL)"));
        assert!(context.contains("2026 Round 1 Pick (originally Contenders's)"));
    }

    #[test]
    fn context_lists_players_only_under_the_receiving_side() {
        let (rosters, users, players) = league_fixture();
        let mut trade = trade_fixture();
        // Send the player the other way; roster 1 now receives nothing.
        trade.adds = Some(HashMap::from([("P9".to_string(), 2u32)]));
        trade.draft_picks = None;

        let context = build_trade_context(&trade, &rosters, &users, &players);

        let contenders_side = context.split("Beta").next().unwrap();
        assert!(contenders_side.contains("Nothing"));
        assert!(!contenders_side.contains("Star Receiver"));
        assert!(context.contains("Star Receiver (WR - DAL)"));
    }

    #[test]
    fn context_marks_empty_sides_and_unknown_players() {
        let (rosters, users, _) = league_fixture();
        let mut trade = trade_fixture();
        trade.draft_picks = None;
        // No player catalog at all: player line falls back to the raw id.
        let context = build_trade_context(&trade, &rosters, &users, &HashMap::new());

        assert!(context.contains("Player P9"));
        // Roster 2 received nothing once the pick is gone.
        assert!(context.contains("Nothing"));
    }

    #[test]
    fn prompt_embeds_context_and_instructions() {
        let prompt = build_analysis_prompt("CONTEXT-MARKER");
        assert!(prompt.contains("CONTEXT-MARKER"));
        assert!(prompt.contains("6-10 exchanges"));
        assert!(prompt.contains("overall_take"));
    }

    #[test]
    fn schema_pins_the_two_speakers() {
        let schema = analysis_schema();
        assert_eq!(
            schema["properties"]["conversation"]["items"]["properties"]["speaker"]["enum"],
            serde_json::json!(["Mike", "Jim"])
        );
    }
}
