//! Orchestrator: runs the holdings and trend pipelines for one wallet group
//!
//! Each call to [`Orchestrator::analyze`] builds a brand new
//! [`AnalysisReport`]; nothing is shared between calls, so a cancelled or
//! superseded run never touches an earlier result.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::holdings::{CommonHoldings, HoldingsAggregator, HoldingsFetcher};
use crate::source::{BalanceSource, HeliusClient, TransactionSource};
use crate::trend::{LinearTrendModel, TrendModel, TrendScorer, WalletScore};
use crate::types::{TrendScore, WalletAddress, WalletWarning};

/// Tunables injected at construction
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    /// Recent transactions scored per wallet
    pub tx_limit: u32,
    /// Ranked common-holdings size
    pub top_k: usize,
    /// Per-fetch timeout
    pub fetch_timeout: Duration,
    /// Max in-flight fetches per pipeline
    pub max_concurrency: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            tx_limit: 10,
            top_k: 11,
            fetch_timeout: Duration::from_secs(10),
            max_concurrency: 8,
        }
    }
}

impl AnalysisSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            tx_limit: config.analysis.tx_limit,
            top_k: config.analysis.top_k,
            fetch_timeout: Duration::from_millis(config.helius.timeout_ms),
            max_concurrency: config.analysis.max_concurrency,
        }
    }
}

/// Combined result handed to the presentation layer
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub generated_at: DateTime<Utc>,
    pub wallets: Vec<WalletAddress>,
    pub holdings: CommonHoldings,
    pub scores: Vec<WalletScore>,
    /// Every degraded wallet, balances first then scoring
    pub warnings: Vec<WalletWarning>,
}

impl AnalysisReport {
    /// Score for `wallet`, if it could be computed
    pub fn score_for(&self, wallet: &WalletAddress) -> Option<TrendScore> {
        self.scores
            .iter()
            .find(|s| &s.wallet == wallet)
            .and_then(|s| s.outcome.score())
    }

    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Coordinates fetch, aggregate and score across a wallet set
pub struct Orchestrator {
    aggregator: HoldingsAggregator,
    scorer: TrendScorer,
}

impl Orchestrator {
    pub fn new(
        settings: AnalysisSettings,
        balances: Arc<dyn BalanceSource>,
        transactions: Arc<dyn TransactionSource>,
        model: Arc<dyn TrendModel>,
    ) -> Self {
        let fetcher = HoldingsFetcher::new(
            balances,
            settings.fetch_timeout,
            settings.max_concurrency,
        );
        let scorer = TrendScorer::new(
            transactions,
            model,
            settings.tx_limit,
            settings.fetch_timeout,
            settings.max_concurrency,
        );

        Self {
            aggregator: HoldingsAggregator::new(fetcher, settings.top_k),
            scorer,
        }
    }

    /// Wire the Helius client and the configured linear model
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Arc::new(HeliusClient::from_config(&config.helius)?);
        let model = Arc::new(LinearTrendModel::from_config(&config.model)?);

        Ok(Self::new(
            AnalysisSettings::from_config(config),
            client.clone(),
            client,
            model,
        ))
    }

    pub fn aggregator(&self) -> &HoldingsAggregator {
        &self.aggregator
    }

    pub fn scorer(&self) -> &TrendScorer {
        &self.scorer
    }

    /// Run both pipelines over `wallets`
    ///
    /// Only an empty wallet list is an error; per-wallet failures end up as
    /// warnings in the report.
    pub async fn analyze(&self, wallets: &[WalletAddress]) -> Result<AnalysisReport> {
        if wallets.is_empty() {
            return Err(Error::NoWalletsProvided);
        }

        let start = Instant::now();
        info!(wallets = wallets.len(), "Starting wallet group analysis");

        let (holdings, scores) = tokio::join!(
            self.aggregator.compute_common_and_ranked(wallets),
            self.scorer.score_all(wallets),
        );
        let holdings = holdings?;

        let mut warnings = holdings.warnings;
        warnings.extend(scores.iter().filter_map(WalletScore::warning));

        let scored = scores.iter().filter(|s| s.outcome.score().is_some()).count();
        info!(
            wallets = wallets.len(),
            common = holdings.holdings.common.len(),
            scored,
            warnings = warnings.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Wallet group analysis complete"
        );

        Ok(AnalysisReport {
            generated_at: Utc::now(),
            wallets: wallets.to_vec(),
            holdings: holdings.holdings,
            scores,
            warnings,
        })
    }

    /// Like [`analyze`](Self::analyze) but abandons the run when `cancel` fires
    ///
    /// A cancelled run returns [`Error::Cancelled`] and produces no report.
    pub async fn analyze_with_cancel(
        &self,
        wallets: &[WalletAddress],
        cancel: CancellationToken,
    ) -> Result<AnalysisReport> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(wallets = wallets.len(), "Analysis cancelled");
                Err(Error::Cancelled)
            }
            report = self.analyze(wallets) => report,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{BalanceSource, TransactionSource};
    use crate::trend::{ScoreOutcome, UnavailableReason};
    use crate::types::{HoldingsSnapshot, TokenId, TransactionRecord, WarningStage};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tokio_test::assert_ok;

    /// In-memory fixture for both sources
    #[derive(Default)]
    struct Fixture {
        balances: HashMap<&'static str, Vec<(&'static str, f64)>>,
        transactions: HashMap<&'static str, Vec<u32>>,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl BalanceSource for Fixture {
        async fn balances(&self, wallet: &WalletAddress) -> Result<HoldingsSnapshot> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let entries = self
                .balances
                .get(wallet.as_str())
                .ok_or_else(|| Error::HttpStatus {
                    status: 502,
                    body: "bad gateway".to_string(),
                })?;
            Ok(HoldingsSnapshot::from_entries(
                wallet.clone(),
                entries.iter().map(|(t, a)| (TokenId::from(*t), *a)),
            ))
        }

        fn name(&self) -> &'static str {
            "fixture"
        }
    }

    #[async_trait]
    impl TransactionSource for Fixture {
        async fn transactions(
            &self,
            wallet: &WalletAddress,
            limit: u32,
        ) -> Result<Vec<TransactionRecord>> {
            let counts = self
                .transactions
                .get(wallet.as_str())
                .ok_or_else(|| Error::Http("connection reset".to_string()))?;
            Ok(counts
                .iter()
                .take(limit as usize)
                .map(|&transfer_count| TransactionRecord {
                    timestamp: 1_700_000_000,
                    fee: 5000,
                    transfer_count,
                    native_transfer_amount: 1_000_000,
                })
                .collect())
        }

        fn name(&self) -> &'static str {
            "fixture"
        }
    }

    fn wallets(names: &[&str]) -> Vec<WalletAddress> {
        names.iter().map(|n| WalletAddress::parse(n).unwrap()).collect()
    }

    fn orchestrator(fixture: Fixture) -> Orchestrator {
        let fixture = Arc::new(fixture);
        let model = Arc::new(LinearTrendModel::new([0.0, 0.0, 1.0, 0.0], 0.0));
        let settings = AnalysisSettings {
            fetch_timeout: Duration::from_secs(2),
            ..Default::default()
        };
        Orchestrator::new(settings, fixture.clone(), fixture, model)
    }

    fn example_fixture() -> Fixture {
        let mut fixture = Fixture::default();
        fixture.balances.insert("A", vec![("X", 5.0), ("Y", 2.0)]);
        fixture.balances.insert("B", vec![("X", 3.0), ("Y", 1.0), ("Z", 9.0)]);
        fixture.balances.insert("C", vec![("X", 1.0), ("Y", 4.0)]);
        fixture.transactions.insert("A", vec![1, 2, 3]);
        fixture.transactions.insert("B", vec![]);
        fixture.transactions.insert("C", vec![4]);
        fixture
    }

    #[tokio::test]
    async fn test_analyze_example_group() {
        let orch = orchestrator(example_fixture());
        let group = wallets(&["A", "B", "C"]);

        let report = assert_ok!(orch.analyze(&group).await);

        assert!(!report.holdings.is_empty());
        let top = &report.holdings.ranked[0];
        assert_eq!(top.token.as_str(), "X");
        assert_eq!(top.total, 9.0);
        assert_eq!(report.holdings.ranked[1].total, 7.0);

        assert_eq!(report.score_for(&group[0]).unwrap().value(), 2.0);
        assert!(report.score_for(&group[1]).is_none());
        assert_eq!(report.score_for(&group[2]).unwrap().value(), 4.0);

        // B has no history: one scoring warning, holdings unaffected
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].stage, WarningStage::Scoring);
        assert!(matches!(
            report.scores[1].outcome,
            ScoreOutcome::Unavailable {
                reason: UnavailableReason::InsufficientHistory,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_balance_failure_degrades_but_completes() {
        let mut fixture = example_fixture();
        fixture.balances.remove("B");
        let orch = orchestrator(fixture);

        let report = orch.analyze(&wallets(&["A", "B", "C"])).await.unwrap();

        assert!(report.holdings.is_empty());
        assert!(report.holdings.ranked.is_empty());
        assert!(report.is_degraded());
        assert!(report
            .warnings
            .iter()
            .any(|w| w.wallet.as_str() == "B" && w.stage == WarningStage::Balances));
        // scoring pipeline is independent of the balance failure
        assert!(report.score_for(&WalletAddress::parse("A").unwrap()).is_some());
    }

    #[tokio::test]
    async fn test_analyze_rejects_empty() {
        let orch = orchestrator(example_fixture());
        assert!(matches!(orch.analyze(&[]).await, Err(Error::NoWalletsProvided)));
    }

    #[tokio::test]
    async fn test_reports_are_independent() {
        let orch = orchestrator(example_fixture());

        let first = orch.analyze(&wallets(&["A", "C"])).await.unwrap();
        let second = orch.analyze(&wallets(&["A", "B"])).await.unwrap();

        assert_eq!(first.wallets.len(), 2);
        assert_eq!(first.holdings.ranked[0].total, 6.0);
        assert_eq!(second.holdings.ranked[0].total, 8.0);
    }

    #[tokio::test]
    async fn test_cancelled_run_returns_no_report() {
        let mut fixture = example_fixture();
        fixture.delay = Some(Duration::from_millis(500));
        let orch = orchestrator(fixture);

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = orch.analyze_with_cancel(&wallets(&["A", "B"]), cancel).await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[test]
    fn test_report_serializes() {
        let report = AnalysisReport {
            generated_at: Utc::now(),
            wallets: wallets(&["A"]),
            holdings: CommonHoldings::default(),
            scores: Vec::new(),
            warnings: Vec::new(),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["wallets"][0], "A");
        assert!(json["holdings"]["ranked"].as_array().unwrap().is_empty());
    }
}
