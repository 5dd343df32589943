//! Scoring model capability
//!
//! Any pre-trained model can drive the scorer as long as it can score a batch
//! of feature rows. Loading model artifacts is left to the caller.

use crate::config::ModelConfig;
use crate::error::{Error, Result};
use crate::trend::features::{FeatureVector, FEATURE_COUNT};

/// Batch prediction over the fixed feature layout
pub trait TrendModel: Send + Sync {
    /// One prediction per row, in row order
    fn predict(&self, batch: &[FeatureVector]) -> Result<Vec<f64>>;

    /// Model name for logs
    fn name(&self) -> &str {
        "model"
    }
}

/// Linear model: `bias + sum(weight_i * feature_i)`
#[derive(Debug, Clone, PartialEq)]
pub struct LinearTrendModel {
    weights: [f64; FEATURE_COUNT],
    bias: f64,
}

impl LinearTrendModel {
    pub fn new(weights: [f64; FEATURE_COUNT], bias: f64) -> Self {
        Self { weights, bias }
    }

    /// Build from configured coefficients
    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        let weights: [f64; FEATURE_COUNT] = config.weights.as_slice().try_into().map_err(|_| {
            Error::Config(format!(
                "model.weights must have {} entries, got {}",
                FEATURE_COUNT,
                config.weights.len()
            ))
        })?;
        Ok(Self::new(weights, config.bias))
    }
}

impl TrendModel for LinearTrendModel {
    fn predict(&self, batch: &[FeatureVector]) -> Result<Vec<f64>> {
        Ok(batch
            .iter()
            .map(|row| {
                row.values()
                    .iter()
                    .zip(self.weights.iter())
                    .fold(self.bias, |acc, (x, w)| acc + x * w)
            })
            .collect())
    }

    fn name(&self) -> &str {
        "linear"
    }
}
