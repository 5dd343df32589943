//! Common holdings: intersection and sum-aggregated ranking
//!
//! Token order is "first seen": the order tokens appear in the first
//! wallet's snapshot. Every common token is in that snapshot, so this is
//! also the first-seen order across the whole group.

use serde::Serialize;
use tracing::info;

use crate::error::{Error, Result};
use crate::holdings::fetcher::HoldingsFetcher;
use crate::types::{AggregateHolding, HoldingsSnapshot, TokenId, WalletAddress, WalletWarning};

/// Tokens held by every wallet, unranked, in first-seen order
pub fn common_tokens(snapshots: &[HoldingsSnapshot]) -> Result<Vec<TokenId>> {
    let (first, rest) = snapshots.split_first().ok_or(Error::NoWalletsProvided)?;

    Ok(first
        .tokens()
        .filter(|token| rest.iter().all(|s| s.contains(token)))
        .cloned()
        .collect())
}

/// Sum each common token across all snapshots, in first-seen order
pub fn aggregate_common(snapshots: &[HoldingsSnapshot]) -> Result<Vec<AggregateHolding>> {
    let common = common_tokens(snapshots)?;

    Ok(common
        .into_iter()
        .map(|token| {
            let total = snapshots
                .iter()
                .map(|s| s.amount(&token).unwrap_or(0.0))
                .sum();
            AggregateHolding { token, total }
        })
        .collect())
}

/// Common holdings sorted by total (descending), truncated to `top_k`
///
/// The sort is stable, so equal totals keep first-seen order.
pub fn rank_common_holdings(snapshots: &[HoldingsSnapshot], top_k: usize) -> Result<CommonHoldings> {
    let aggregated = aggregate_common(snapshots)?;
    let common: Vec<TokenId> = aggregated.iter().map(|h| h.token.clone()).collect();

    let mut ranked = aggregated;
    ranked.sort_by(|a, b| b.total.total_cmp(&a.total));
    ranked.truncate(top_k);

    Ok(CommonHoldings { common, ranked })
}

/// Intersection plus ranked totals for one request
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CommonHoldings {
    /// Full common token set, first-seen order
    pub common: Vec<TokenId>,
    /// Top-K aggregate holdings, largest first
    pub ranked: Vec<AggregateHolding>,
}

impl CommonHoldings {
    /// No token is shared by the whole group
    pub fn is_empty(&self) -> bool {
        self.common.is_empty()
    }
}

/// Common holdings together with the per-wallet fetch warnings behind them
#[derive(Debug, Clone, Serialize)]
pub struct HoldingsReport {
    pub holdings: CommonHoldings,
    pub warnings: Vec<WalletWarning>,
}

/// Fetches every wallet's balances and reduces them to [`CommonHoldings`]
pub struct HoldingsAggregator {
    fetcher: HoldingsFetcher,
    top_k: usize,
}

impl HoldingsAggregator {
    pub fn new(fetcher: HoldingsFetcher, top_k: usize) -> Self {
        Self { fetcher, top_k }
    }

    /// Fetch, intersect and rank holdings across `wallets`
    pub async fn compute_common_and_ranked(
        &self,
        wallets: &[WalletAddress],
    ) -> Result<HoldingsReport> {
        if wallets.is_empty() {
            return Err(Error::NoWalletsProvided);
        }

        let outcomes = self.fetcher.fetch_all(wallets).await;

        let mut snapshots = Vec::with_capacity(outcomes.len());
        let mut warnings = Vec::new();
        for outcome in outcomes {
            if let Some(warning) = outcome.warning {
                warnings.push(warning);
            }
            snapshots.push(outcome.snapshot);
        }

        let holdings = rank_common_holdings(&snapshots, self.top_k)?;

        if holdings.is_empty() {
            info!(
                wallets = wallets.len(),
                failed = warnings.len(),
                "No common holdings across wallet group"
            );
        } else {
            info!(
                wallets = wallets.len(),
                common = holdings.common.len(),
                ranked = holdings.ranked.len(),
                "Computed common holdings"
            );
        }

        Ok(HoldingsReport { holdings, warnings })
    }
}
