//! Core value types shared by the fetch, aggregation and scoring stages
//!
//! Everything here is request-scoped: snapshots and records are built once
//! per fetch and never mutated afterwards.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::error::{Error, Result};

/// Blockchain account address of a tracked wallet
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Parse a wallet address from user input (trimmed, must be non-empty)
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidWallet(input.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl std::str::FromStr for WalletAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Split free-form text into wallet addresses
///
/// Accepts newline, comma or whitespace separated input. Blank entries are
/// skipped and duplicates keep their first position.
pub fn parse_wallet_list(text: &str) -> Vec<WalletAddress> {
    let mut seen = HashSet::new();
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter_map(|part| WalletAddress::parse(part).ok())
        .filter(|wallet| seen.insert(wallet.clone()))
        .collect()
}

/// Token mint address, the join key across wallets
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TokenId(String);

impl TokenId {
    pub fn new(mint: impl Into<String>) -> Self {
        Self(mint.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for TokenId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Point-in-time token balances of one wallet
///
/// Only strictly positive, finite amounts are kept. Entries remember the
/// order the source reported them in, which drives tie-breaking in rankings.
#[derive(Debug, Clone)]
pub struct HoldingsSnapshot {
    wallet: WalletAddress,
    entries: Vec<(TokenId, f64)>,
    index: HashMap<TokenId, usize>,
}

impl HoldingsSnapshot {
    /// Snapshot with no holdings (used for failed fetches)
    pub fn empty(wallet: WalletAddress) -> Self {
        Self {
            wallet,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Build a snapshot from raw `(mint, amount)` pairs
    ///
    /// A repeated mint overwrites the earlier amount but keeps its position.
    pub fn from_entries<I>(wallet: WalletAddress, entries: I) -> Self
    where
        I: IntoIterator<Item = (TokenId, f64)>,
    {
        let mut snapshot = Self::empty(wallet);
        for (token, amount) in entries {
            if !(amount.is_finite() && amount > 0.0) {
                continue;
            }
            match snapshot.index.get(&token) {
                Some(&pos) => snapshot.entries[pos].1 = amount,
                None => {
                    snapshot.index.insert(token.clone(), snapshot.entries.len());
                    snapshot.entries.push((token, amount));
                }
            }
        }
        snapshot
    }

    pub fn wallet(&self) -> &WalletAddress {
        &self.wallet
    }

    /// Amount held of `token`, if any
    pub fn amount(&self, token: &TokenId) -> Option<f64> {
        self.index.get(token).map(|&pos| self.entries[pos].1)
    }

    pub fn contains(&self, token: &TokenId) -> bool {
        self.index.contains_key(token)
    }

    /// Held tokens in source order
    pub fn tokens(&self) -> impl Iterator<Item = &TokenId> {
        self.entries.iter().map(|(token, _)| token)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One wallet activity event, reduced to the fields the scorer consumes
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TransactionRecord {
    /// Block time, unix seconds
    pub timestamp: i64,
    /// Fee in lamports
    pub fee: u64,
    /// Number of token transfers in the transaction
    pub transfer_count: u32,
    /// Sum of native SOL transfers, lamports
    pub native_transfer_amount: u64,
}

/// Total held across the group for one commonly-held token
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateHolding {
    pub token: TokenId,
    pub total: f64,
}

/// Per-wallet trend value, always rounded to 2 decimal places
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct TrendScore(f64);

impl TrendScore {
    /// Mean of the model's per-transaction predictions, rounded to 2dp.
    /// Returns None for an empty prediction set or a non-finite mean.
    pub fn from_predictions(predictions: &[f64]) -> Option<Self> {
        if predictions.is_empty() {
            return None;
        }
        // Dividing first keeps large finite predictions from summing to inf
        let n = predictions.len() as f64;
        let mean: f64 = predictions.iter().map(|p| p / n).sum();
        if !mean.is_finite() {
            return None;
        }

        // Above f64::MAX / 100 every value is already integral
        let scaled = mean * 100.0;
        if scaled.is_finite() {
            Some(Self(scaled.round() / 100.0))
        } else {
            Some(Self(mean))
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for TrendScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&format!("{:.2}", self.0))
    }
}

/// Pipeline stage a degradation was observed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningStage {
    Balances,
    Scoring,
}

/// Explanation attached to a wallet whose results were degraded
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalletWarning {
    pub wallet: WalletAddress,
    pub stage: WarningStage,
    pub message: String,
}

impl WalletWarning {
    pub fn new(wallet: WalletAddress, stage: WarningStage, message: impl Into<String>) -> Self {
        Self {
            wallet,
            stage,
            message: message.into(),
        }
    }
}

impl fmt::Display for WalletWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self.stage {
            WarningStage::Balances => "balances",
            WarningStage::Scoring => "scoring",
        };
        write!(f, "[{}] {}: {}", stage, self.wallet, self.message)
    }
}
