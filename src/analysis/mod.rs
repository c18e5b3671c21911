//! Trade analysis generation
//!
//! The [`TradeAnalysis`] document model and the OpenAI-backed generator that
//! produces one from a trade description.

pub mod generator;
pub mod types;

pub use generator::{AnalysisGenerator, OpenAiGenerator, build_trade_context};
pub use types::{
    DialogueLine, GenerationError, ReceivedAssets, ReceivedPick, ReceivedPlayer, Speaker,
    TeamVerdict, TradeAnalysis,
};
