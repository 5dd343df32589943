//! Per-wallet trend scoring
//!
//! Fetches a wallet's most recent transactions, runs them through the model
//! and reduces the predictions to one rounded score.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::source::TransactionSource;
use crate::trend::features::build_batch;
use crate::trend::model::TrendModel;
use crate::types::{TransactionRecord, TrendScore, WalletAddress, WalletWarning, WarningStage};

/// Why a wallet has no score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableReason {
    /// Transaction fetch failed or timed out
    FetchFailed,
    /// No transactions to score
    InsufficientHistory,
    /// Model rejected the batch or produced unusable output
    ModelFailed,
}

/// Score or failure marker for one wallet
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScoreOutcome {
    Scored {
        score: TrendScore,
        transactions: usize,
    },
    Unavailable {
        reason: UnavailableReason,
        detail: String,
    },
}

impl ScoreOutcome {
    pub fn score(&self) -> Option<TrendScore> {
        match self {
            ScoreOutcome::Scored { score, .. } => Some(*score),
            ScoreOutcome::Unavailable { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalletScore {
    pub wallet: WalletAddress,
    #[serde(flatten)]
    pub outcome: ScoreOutcome,
}

impl WalletScore {
    /// Warning for the report if this wallet could not be scored
    pub fn warning(&self) -> Option<WalletWarning> {
        match &self.outcome {
            ScoreOutcome::Scored { .. } => None,
            ScoreOutcome::Unavailable { detail, .. } => Some(WalletWarning::new(
                self.wallet.clone(),
                WarningStage::Scoring,
                detail.clone(),
            )),
        }
    }
}

/// Reduce a wallet's records to a score with `model`
pub fn score_records(
    wallet: &WalletAddress,
    records: &[TransactionRecord],
    model: &dyn TrendModel,
) -> Result<TrendScore> {
    if records.is_empty() {
        return Err(Error::InsufficientHistory(wallet.to_string()));
    }

    let batch = build_batch(records);
    let predictions = model.predict(&batch)?;

    if predictions.len() != batch.len() {
        return Err(Error::Model(format!(
            "{} returned {} predictions for {} rows",
            model.name(),
            predictions.len(),
            batch.len()
        )));
    }
    if predictions.iter().any(|p| !p.is_finite()) {
        return Err(Error::Model(format!("{} produced a non-finite prediction", model.name())));
    }

    // The batch is non-empty here, so None can only mean a non-finite mean
    TrendScore::from_predictions(&predictions)
        .ok_or_else(|| Error::Model(format!("{} predictions have no finite mean", model.name())))
}

/// Trend scorer over a [`TransactionSource`] and a [`TrendModel`]
#[derive(Clone)]
pub struct TrendScorer {
    source: Arc<dyn TransactionSource>,
    model: Arc<dyn TrendModel>,
    tx_limit: u32,
    timeout: Duration,
    max_concurrency: usize,
}

impl TrendScorer {
    pub fn new(
        source: Arc<dyn TransactionSource>,
        model: Arc<dyn TrendModel>,
        tx_limit: u32,
        timeout: Duration,
        max_concurrency: usize,
    ) -> Self {
        Self {
            source,
            model,
            tx_limit,
            timeout,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Fetch up to `tx_limit` recent transactions, failing loudly
    pub async fn fetch_transactions(&self, wallet: &WalletAddress) -> Result<Vec<TransactionRecord>> {
        let fetch = self.source.transactions(wallet, self.tx_limit);
        let mut records = match tokio::time::timeout(self.timeout, fetch).await {
            Ok(result) => result?,
            Err(_) => return Err(Error::Timeout(self.timeout.as_millis() as u64)),
        };
        records.truncate(self.tx_limit as usize);
        Ok(records)
    }

    /// Score one wallet
    ///
    /// Fetch failures and timeouts propagate unchanged as fetch errors (see
    /// [`Error::is_fetch_failure`]). `InsufficientHistory` is reserved for a
    /// wallet whose fetch succeeded but returned no transactions.
    pub async fn score(&self, wallet: &WalletAddress) -> Result<TrendScore> {
        let records = self.fetch_transactions(wallet).await?;
        let score = score_records(wallet, &records, self.model.as_ref())?;

        debug!(
            wallet = %wallet,
            transactions = records.len(),
            model = self.model.name(),
            score = %score,
            "Scored wallet"
        );

        Ok(score)
    }

    /// Score one wallet, turning failures into an unavailable marker
    pub async fn score_wallet(&self, wallet: &WalletAddress) -> WalletScore {
        let outcome = match self.fetch_transactions(wallet).await {
            Ok(records) => match score_records(wallet, &records, self.model.as_ref()) {
                Ok(score) => ScoreOutcome::Scored {
                    score,
                    transactions: records.len(),
                },
                Err(e) => unavailable(wallet, e),
            },
            Err(e) => unavailable(wallet, e),
        };

        WalletScore {
            wallet: wallet.clone(),
            outcome,
        }
    }

    /// Score every wallet concurrently; output order matches `wallets`
    pub async fn score_all(&self, wallets: &[WalletAddress]) -> Vec<WalletScore> {
        stream::iter(wallets)
            .map(|wallet| self.score_wallet(wallet))
            .buffered(self.max_concurrency)
            .collect()
            .await
    }
}

fn unavailable(wallet: &WalletAddress, error: Error) -> ScoreOutcome {
    let reason = match &error {
        Error::InsufficientHistory(_) => UnavailableReason::InsufficientHistory,
        e if e.is_fetch_failure() => UnavailableReason::FetchFailed,
        Error::Model(_) => UnavailableReason::ModelFailed,
        _ => UnavailableReason::FetchFailed,
    };

    warn!(wallet = %wallet, reason = ?reason, error = %error, "Trend score unavailable");

    ScoreOutcome::Unavailable {
        reason,
        detail: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trend::features::FeatureVector;
    use crate::trend::model::LinearTrendModel;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Source returning `count` transactions per known wallet
    struct CountSource(HashMap<&'static str, usize>);

    #[async_trait]
    impl TransactionSource for CountSource {
        async fn transactions(
            &self,
            wallet: &WalletAddress,
            limit: u32,
        ) -> Result<Vec<TransactionRecord>> {
            let count = self
                .0
                .get(wallet.as_str())
                .copied()
                .ok_or_else(|| Error::Http("unreachable".to_string()))?;

            Ok((0..count.min(limit as usize))
                .map(|i| TransactionRecord {
                    timestamp: 1_700_000_000 - i as i64,
                    fee: 5000,
                    transfer_count: i as u32,
                    native_transfer_amount: 0,
                })
                .collect())
        }

        fn name(&self) -> &'static str {
            "count"
        }
    }

    /// Source that never answers for `slow` and returns one record otherwise
    struct StallingSource {
        slow: &'static str,
    }

    #[async_trait]
    impl TransactionSource for StallingSource {
        async fn transactions(
            &self,
            wallet: &WalletAddress,
            _limit: u32,
        ) -> Result<Vec<TransactionRecord>> {
            if wallet.as_str() == self.slow {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            Ok(vec![TransactionRecord {
                timestamp: 1_700_000_000,
                fee: 5000,
                transfer_count: 2,
                native_transfer_amount: 0,
            }])
        }

        fn name(&self) -> &'static str {
            "stalling"
        }
    }

    struct BrokenModel;

    impl TrendModel for BrokenModel {
        fn predict(&self, _batch: &[FeatureVector]) -> Result<Vec<f64>> {
            Ok(vec![1.0])
        }
    }

    fn wallet(s: &str) -> WalletAddress {
        WalletAddress::parse(s).unwrap()
    }

    fn transfer_count_model() -> Arc<dyn TrendModel> {
        Arc::new(LinearTrendModel::new([0.0, 0.0, 1.0, 0.0], 0.0))
    }

    fn scorer(counts: &[(&'static str, usize)], model: Arc<dyn TrendModel>) -> TrendScorer {
        let source = CountSource(counts.iter().copied().collect());
        TrendScorer::new(Arc::new(source), model, 10, Duration::from_secs(1), 4)
    }

    #[test]
    fn test_score_records_mean_and_rounding() {
        let records: Vec<_> = [1u32, 2, 2]
            .iter()
            .map(|&n| TransactionRecord {
                timestamp: 0,
                fee: 0,
                transfer_count: n,
                native_transfer_amount: 0,
            })
            .collect();

        let model = LinearTrendModel::new([0.0, 0.0, 1.0, 0.0], 0.0);
        let score = score_records(&wallet("w"), &records, &model).unwrap();
        assert_eq!(score.value(), 1.67);
    }

    #[test]
    fn test_score_records_empty() {
        let model = LinearTrendModel::new([0.0; 4], 0.0);
        let result = score_records(&wallet("w"), &[], &model);
        assert!(matches!(result, Err(Error::InsufficientHistory(_))));
    }

    #[tokio::test]
    async fn test_score_uses_tx_limit() {
        // 25 available, limit 10 -> transfer counts 0..=9, mean 4.5
        let scorer = scorer(&[("busy", 25)], transfer_count_model());
        let score = scorer.score(&wallet("busy")).await.unwrap();
        assert_eq!(score.value(), 4.5);
    }

    #[tokio::test]
    async fn test_empty_history_isolated_to_wallet() {
        let scorer = scorer(&[("active", 3), ("idle", 0)], transfer_count_model());
        let results = scorer
            .score_all(&[wallet("active"), wallet("idle"), wallet("gone")])
            .await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].outcome.score().unwrap().value(), 1.0);
        assert!(results[0].warning().is_none());

        assert!(matches!(
            results[1].outcome,
            ScoreOutcome::Unavailable {
                reason: UnavailableReason::InsufficientHistory,
                ..
            }
        ));
        assert!(matches!(
            results[2].outcome,
            ScoreOutcome::Unavailable {
                reason: UnavailableReason::FetchFailed,
                ..
            }
        ));
        assert_eq!(results[2].warning().unwrap().stage, WarningStage::Scoring);
    }

    #[tokio::test]
    async fn test_fetch_failure_propagates_from_score() {
        let scorer = scorer(&[], transfer_count_model());
        let err = scorer.score(&wallet("gone")).await.unwrap_err();
        assert!(err.is_fetch_failure());
    }

    #[tokio::test]
    async fn test_prediction_count_mismatch() {
        let scorer = scorer(&[("w", 3)], Arc::new(BrokenModel));
        let result = scorer.score_wallet(&wallet("w")).await;
        assert!(matches!(
            result.outcome,
            ScoreOutcome::Unavailable {
                reason: UnavailableReason::ModelFailed,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_transaction_timeout_isolated_to_wallet() {
        let scorer = TrendScorer::new(
            Arc::new(StallingSource { slow: "slow" }),
            transfer_count_model(),
            10,
            Duration::from_millis(50),
            4,
        );

        let err = scorer.score(&wallet("slow")).await.unwrap_err();
        assert!(matches!(err, Error::Timeout(50)));

        let results = scorer
            .score_all(&[wallet("fast"), wallet("slow"), wallet("other")])
            .await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].outcome.score().unwrap().value(), 2.0);
        assert!(matches!(
            results[1].outcome,
            ScoreOutcome::Unavailable {
                reason: UnavailableReason::FetchFailed,
                ..
            }
        ));
        assert_eq!(results[1].wallet.as_str(), "slow");
        assert_eq!(results[2].outcome.score().unwrap().value(), 2.0);
    }

    #[test]
    fn test_large_bias_scores_finite() {
        let records = vec![
            TransactionRecord {
                timestamp: 1_700_000_000,
                fee: 5000,
                transfer_count: 1,
                native_transfer_amount: 0,
            };
            2
        ];

        let model = LinearTrendModel::new([0.0; 4], 1e308);
        let score = score_records(&wallet("w"), &records, &model).unwrap();
        assert!(score.value().is_finite());
        assert_eq!(score.value(), 1e308);
    }

    #[test]
    fn test_outcome_serialization() {
        let score = WalletScore {
            wallet: wallet("w"),
            outcome: ScoreOutcome::Unavailable {
                reason: UnavailableReason::InsufficientHistory,
                detail: "none".to_string(),
            },
        };
        let json = serde_json::to_value(&score).unwrap();
        assert_eq!(json["wallet"], "w");
        assert_eq!(json["status"], "unavailable");
        assert_eq!(json["reason"], "insufficient_history");
    }
}
