//! Wallet trend scoring
//!
//! Recent transactions are projected into fixed 4-column feature rows and
//! scored by a pluggable [`TrendModel`].

pub mod features;
pub mod model;
pub mod scorer;

pub use features::{build_batch, FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
pub use model::{LinearTrendModel, TrendModel};
pub use scorer::{score_records, ScoreOutcome, TrendScorer, UnavailableReason, WalletScore};
