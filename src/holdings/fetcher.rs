//! Balance fetching with per-wallet failure isolation

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::Error;
use crate::source::BalanceSource;
use crate::types::{HoldingsSnapshot, WalletAddress, WalletWarning, WarningStage};

/// Result of fetching one wallet's balances
///
/// A failed fetch still yields a (empty) snapshot, with the reason attached.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub snapshot: HoldingsSnapshot,
    pub warning: Option<WalletWarning>,
}

/// Fetches balance snapshots from a [`BalanceSource`]
#[derive(Clone)]
pub struct HoldingsFetcher {
    source: Arc<dyn BalanceSource>,
    timeout: Duration,
    max_concurrency: usize,
}

impl HoldingsFetcher {
    pub fn new(source: Arc<dyn BalanceSource>, timeout: Duration, max_concurrency: usize) -> Self {
        Self {
            source,
            timeout,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Fetch one wallet's holdings
    ///
    /// Transport errors, bad status codes, malformed payloads and timeouts all
    /// produce an empty snapshot plus a warning instead of an error.
    pub async fn fetch_holdings(&self, wallet: &WalletAddress) -> FetchOutcome {
        let start = Instant::now();

        let result = match tokio::time::timeout(self.timeout, self.source.balances(wallet)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(self.timeout.as_millis() as u64)),
        };

        match result {
            Ok(snapshot) => {
                debug!(
                    wallet = %wallet,
                    source = self.source.name(),
                    tokens = snapshot.len(),
                    latency_ms = start.elapsed().as_millis() as u64,
                    "Fetched wallet holdings"
                );
                FetchOutcome {
                    snapshot,
                    warning: None,
                }
            }
            Err(e) => {
                warn!(
                    wallet = %wallet,
                    source = self.source.name(),
                    error = %e,
                    "Balance fetch failed, treating wallet as holding nothing"
                );
                FetchOutcome {
                    snapshot: HoldingsSnapshot::empty(wallet.clone()),
                    warning: Some(WalletWarning::new(
                        wallet.clone(),
                        WarningStage::Balances,
                        format!("balance fetch failed: {}", e),
                    )),
                }
            }
        }
    }

    /// Fetch every wallet concurrently; output order matches `wallets`
    pub async fn fetch_all(&self, wallets: &[WalletAddress]) -> Vec<FetchOutcome> {
        stream::iter(wallets)
            .map(|wallet| self.fetch_holdings(wallet))
            .buffered(self.max_concurrency)
            .collect()
            .await
    }
}
