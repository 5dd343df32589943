//! KOL Scanner Library
//!
//! Finds the tokens a group of wallets commonly holds, ranks them by total
//! held amount, and scores each wallet's recent activity with a pluggable
//! trend model.

pub mod cli;
pub mod config;
pub mod error;
pub mod holdings;
pub mod orchestrator;
pub mod source;
pub mod trend;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use orchestrator::{AnalysisReport, AnalysisSettings, Orchestrator};
pub use types::{AggregateHolding, HoldingsSnapshot, TokenId, TransactionRecord, TrendScore, WalletAddress};
