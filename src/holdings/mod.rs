//! Portfolio overlap across a wallet group
//!
//! The fetcher turns each wallet into a snapshot (degrading failures to an
//! empty one), the aggregator intersects and ranks them.

pub mod aggregator;
pub mod fetcher;

pub use aggregator::{
    aggregate_common, common_tokens, rank_common_holdings, CommonHoldings, HoldingsAggregator,
    HoldingsReport,
};
pub use fetcher::{FetchOutcome, HoldingsFetcher};
