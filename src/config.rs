//! Configuration module for environment variables and application settings

use anyhow::{Result, anyhow};
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    /// OpenAI API key for analysis generation
    pub openai_api_key: String,

    /// Chat model used for generation
    pub openai_model: String,

    /// Sleeper league to watch for trades
    pub sleeper_league_id: String,

    /// PostgreSQL connection URL
    pub database_url: String,

    /// Version tag stamped on every generated analysis; bump it to have
    /// future regenerations overwrite old documents
    pub analysis_version: String,

    /// Seconds between trade discovery runs
    pub cron_interval_secs: u64,

    /// Origin allowed to call the analysis API
    pub cors_allowed_origin: String,

    /// Server configuration
    pub server: ServerConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            openai_api_key: env::var("OPENAI_API_KEY")
                .map_err(|_| anyhow!("OPENAI_API_KEY environment variable is required"))?,

            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),

            sleeper_league_id: env::var("SLEEPER_LEAGUE_ID")
                .map_err(|_| anyhow!("SLEEPER_LEAGUE_ID environment variable is required"))?,

            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow!("DATABASE_URL environment variable is required"))?,

            analysis_version: env::var("ANALYSIS_VERSION").unwrap_or_else(|_| "v1".to_string()),

            cron_interval_secs: env::var("CRON_INTERVAL_SECS")
                .unwrap_or_else(|_| "3600".to_string())
                .parse()
                .unwrap_or(3600),

            cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),

            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()
                    .unwrap_or(3000),
            },
        })
    }
}
