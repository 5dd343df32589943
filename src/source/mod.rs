//! Upstream data sources
//!
//! The fetch stages only see these traits, so the Helius client can be
//! swapped for any other indexer (or an in-memory double in tests).

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{HoldingsSnapshot, TransactionRecord, WalletAddress};

pub mod helius;

pub use helius::HeliusClient;

/// Reads a wallet's current token balances
#[async_trait]
pub trait BalanceSource: Send + Sync {
    /// Fetch the wallet's positive token balances
    async fn balances(&self, wallet: &WalletAddress) -> Result<HoldingsSnapshot>;

    /// Source name for logs
    fn name(&self) -> &'static str;
}

/// Reads a wallet's most recent transactions
#[async_trait]
pub trait TransactionSource: Send + Sync {
    /// Fetch up to `limit` transactions, most recent first
    async fn transactions(&self, wallet: &WalletAddress, limit: u32)
        -> Result<Vec<TransactionRecord>>;

    /// Source name for logs
    fn name(&self) -> &'static str;
}
