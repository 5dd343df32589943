//! Helius API client for wallet balances and transaction history
//!
//! Provides access to:
//! - Token balances per wallet (`/v0/addresses/{addr}/balances`)
//! - Enhanced transaction history (`/v0/addresses/{addr}/transactions`)

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::HeliusConfig;
use crate::error::{Error, Result};
use crate::source::{BalanceSource, TransactionSource};
use crate::types::{HoldingsSnapshot, TokenId, TransactionRecord, WalletAddress};

/// Helius API client
pub struct HeliusClient {
    /// HTTP client
    client: Client,
    /// API key for balance reads
    api_key: String,
    /// API key for transaction reads
    transactions_api_key: String,
    /// Base URL for REST API
    rest_base_url: String,
    /// Request timeout
    timeout: Duration,
}

impl HeliusClient {
    /// Create a client from configuration
    pub fn from_config(config: &HeliusConfig) -> Result<Self> {
        Self::with_options(
            config.api_key.clone(),
            config.transactions_key().to_string(),
            config.base_url.clone(),
            Duration::from_millis(config.timeout_ms),
        )
    }

    fn with_options(
        api_key: String,
        transactions_api_key: String,
        rest_base_url: String,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            transactions_api_key,
            rest_base_url: rest_base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn balances_url(&self, address: &str) -> String {
        format!(
            "{}/v0/addresses/{}/balances?api-key={}",
            self.rest_base_url, address, self.api_key
        )
    }

    fn transactions_url(&self, address: &str, limit: u32) -> String {
        format!(
            "{}/v0/addresses/{}/transactions?api-key={}&limit={}",
            self.rest_base_url, address, self.transactions_api_key, limit
        )
    }

    /// GET `url` and return the body of a 2xx response
    async fn get_body(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout(self.timeout.as_millis() as u64)
                } else {
                    Error::Http(format!("Helius request failed: {}", e.without_url()))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        response
            .text()
            .await
            .map_err(|e| Error::Http(format!("Failed to read Helius response: {}", e.without_url())))
    }

    /// Fetch a wallet's token balances
    pub async fn get_balances(&self, wallet: &WalletAddress) -> Result<HoldingsSnapshot> {
        debug!(wallet = %wallet, "Fetching wallet balances");
        let body = self.get_body(&self.balances_url(wallet.as_str())).await?;
        parse_balances(wallet, &body)
    }

    /// Fetch a wallet's recent transactions
    pub async fn get_transactions(
        &self,
        wallet: &WalletAddress,
        limit: u32,
    ) -> Result<Vec<TransactionRecord>> {
        debug!(wallet = %wallet, limit, "Fetching wallet transactions");
        let body = self
            .get_body(&self.transactions_url(wallet.as_str(), limit))
            .await?;
        parse_transactions(&body)
    }
}

#[async_trait]
impl BalanceSource for HeliusClient {
    async fn balances(&self, wallet: &WalletAddress) -> Result<HoldingsSnapshot> {
        self.get_balances(wallet).await
    }

    fn name(&self) -> &'static str {
        "helius"
    }
}

#[async_trait]
impl TransactionSource for HeliusClient {
    async fn transactions(
        &self,
        wallet: &WalletAddress,
        limit: u32,
    ) -> Result<Vec<TransactionRecord>> {
        self.get_transactions(wallet, limit).await
    }

    fn name(&self) -> &'static str {
        "helius"
    }
}

/// Parse a balances payload into a snapshot
///
/// Entries whose amount is missing, non-numeric or not strictly positive are
/// dropped. A payload without a `tokens` list is rejected.
pub fn parse_balances(wallet: &WalletAddress, body: &str) -> Result<HoldingsSnapshot> {
    let response: BalancesResponse = serde_json::from_str(body)
        .map_err(|e| Error::Deserialization(format!("Failed to parse balances: {}", e)))?;

    let entries = response.tokens.into_iter().filter_map(|token| {
        let amount = token.amount.as_ref().and_then(Amount::as_f64)?;
        Some((TokenId::new(token.mint), amount))
    });

    Ok(HoldingsSnapshot::from_entries(wallet.clone(), entries))
}

/// Parse a transactions payload into records, preserving order
pub fn parse_transactions(body: &str) -> Result<Vec<TransactionRecord>> {
    let transactions: Vec<HeliusTransaction> = serde_json::from_str(body)
        .map_err(|e| Error::Deserialization(format!("Failed to parse transactions: {}", e)))?;

    transactions.iter().map(HeliusTransaction::to_record).collect()
}

// ============ Helius API Response Types ============
// Only the fields the balance and feature stages read; serde ignores the rest

#[derive(Debug, Deserialize)]
struct BalancesResponse {
    tokens: Vec<TokenBalance>,
}

#[derive(Debug, Deserialize)]
struct TokenBalance {
    mint: String,
    #[serde(default)]
    amount: Option<Amount>,
}

/// Amount as reported by the API: usually a number, sometimes a string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Amount {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl Amount {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Amount::Number(n) => Some(*n),
            Amount::Text(s) => s.trim().parse().ok(),
            Amount::Other(_) => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct HeliusTransaction {
    timestamp: Option<i64>,
    fee: Option<u64>,
    #[serde(rename = "nativeTransfers", default)]
    native_transfers: Option<Vec<NativeTransfer>>,
    #[serde(rename = "tokenTransfers", default)]
    token_transfers: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct NativeTransfer {
    #[serde(default)]
    amount: u64,
}

impl HeliusTransaction {
    fn to_record(&self) -> Result<TransactionRecord> {
        let native_transfer_amount = self
            .native_transfers
            .iter()
            .flatten()
            .try_fold(0u64, |total, transfer| total.checked_add(transfer.amount))
            .ok_or_else(|| {
                Error::Deserialization(
                    "Native transfer total overflows u64 lamports".to_string(),
                )
            })?;

        Ok(TransactionRecord {
            timestamp: self.timestamp.unwrap_or(0),
            fee: self.fee.unwrap_or(0),
            transfer_count: self
                .token_transfers
                .as_ref()
                .map(|t| u32::try_from(t.len()).unwrap_or(u32::MAX))
                .unwrap_or(0),
            native_transfer_amount,
        })
    }
}
