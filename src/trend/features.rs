//! Feature construction from transaction records

use serde::Serialize;

use crate::types::TransactionRecord;

/// Number of columns in a feature vector
pub const FEATURE_COUNT: usize = 4;

/// Column names, in model input order
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] =
    ["timestamp", "fee", "transfer_count", "native_transfer_amount"];

/// One model input row: `[timestamp, fee, transfer_count, native_transfer_amount]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FeatureVector(pub [f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }
}

impl From<&TransactionRecord> for FeatureVector {
    fn from(record: &TransactionRecord) -> Self {
        Self([
            record.timestamp as f64,
            record.fee as f64,
            record.transfer_count as f64,
            record.native_transfer_amount as f64,
        ])
    }
}

/// Project records into a batch, keeping record order
pub fn build_batch(records: &[TransactionRecord]) -> Vec<FeatureVector> {
    records.iter().map(FeatureVector::from).collect()
}
