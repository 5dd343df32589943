//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::trend::features::{FEATURE_COUNT, FEATURE_NAMES};
use crate::types::WalletAddress;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub helius: HeliusConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub model: ModelConfig,
}

/// Balance/transaction source settings
#[derive(Debug, Clone, Deserialize)]
pub struct HeliusConfig {
    /// Credential for the balances endpoint
    #[serde(default)]
    pub api_key: String,
    /// Credential for the transactions endpoint (falls back to `api_key`)
    #[serde(default)]
    pub transactions_api_key: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-fetch timeout
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl HeliusConfig {
    /// Credential used for transaction reads
    pub fn transactions_key(&self) -> &str {
        self.transactions_api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .unwrap_or(&self.api_key)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Recent transactions fetched per wallet for scoring
    #[serde(default = "default_tx_limit")]
    pub tx_limit: u32,
    /// Size of the ranked common-holdings list
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Max in-flight fetches per pipeline
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Default wallet set when none is given on the command line
    #[serde(default)]
    pub wallets: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            tx_limit: default_tx_limit(),
            top_k: default_top_k(),
            max_concurrency: default_max_concurrency(),
            wallets: Vec::new(),
        }
    }
}

/// Coefficients of the linear reference trend model
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// One weight per feature column: timestamp, fee, transfer count, native amount
    #[serde(default = "default_weights")]
    pub weights: Vec<f64>,
    #[serde(default)]
    pub bias: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            weights: default_weights(),
            bias: 0.0,
        }
    }
}

fn default_base_url() -> String {
    "https://api.helius.xyz".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_tx_limit() -> u32 {
    10
}

fn default_top_k() -> usize {
    11
}

fn default_max_concurrency() -> usize {
    8
}

fn default_weights() -> Vec<f64> {
    // fee in lamports, native amount scaled to SOL, timestamp ignored
    vec![0.0, -1e-6, 0.1, 1e-9]
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            // Start with defaults
            .set_default("helius.base_url", default_base_url())?
            .set_default("helius.timeout_ms", default_timeout_ms() as i64)?
            .set_default("analysis.tx_limit", default_tx_limit() as i64)?
            .set_default("analysis.top_k", default_top_k() as i64)?
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (prefix KOL__)
            .add_source(
                config::Environment::with_prefix("KOL")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("analysis.wallets"),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.helius.api_key.trim().is_empty() {
            anyhow::bail!("helius.api_key must be set (or KOL__HELIUS__API_KEY)");
        }

        if self.helius.timeout_ms == 0 {
            anyhow::bail!("helius.timeout_ms must be positive");
        }

        if self.analysis.tx_limit == 0 {
            anyhow::bail!("analysis.tx_limit must be positive");
        }

        if self.analysis.top_k == 0 {
            anyhow::bail!("analysis.top_k must be positive");
        }

        if self.analysis.max_concurrency == 0 {
            anyhow::bail!("analysis.max_concurrency must be positive");
        }

        if self.model.weights.len() != FEATURE_COUNT {
            anyhow::bail!(
                "model.weights must have {} entries, got {}",
                FEATURE_COUNT,
                self.model.weights.len()
            );
        }

        if !self.model.bias.is_finite() || self.model.weights.iter().any(|w| !w.is_finite()) {
            anyhow::bail!("model coefficients must be finite");
        }

        for wallet in &self.analysis.wallets {
            WalletAddress::parse(wallet)
                .with_context(|| format!("Invalid wallet in analysis.wallets: {:?}", wallet))?;
        }

        Ok(())
    }

    /// Get masked configuration for display (hide secrets)
    pub fn masked_display(&self) -> String {
        format!(
            r#"Configuration:
  Helius:
    base_url: {}
    api_key: {}
    transactions_api_key: {}
    timeout: {}ms
  Analysis:
    tx_limit: {}
    top_k: {}
    max_concurrency: {}
    wallets: {}
  Model:
    weights: {}
    bias: {}
"#,
            self.helius.base_url,
            mask_secret(&self.helius.api_key),
            match self.helius.transactions_api_key.as_deref() {
                Some(key) if !key.is_empty() => mask_secret(key),
                _ => "(same as api_key)".to_string(),
            },
            self.helius.timeout_ms,
            self.analysis.tx_limit,
            self.analysis.top_k,
            self.analysis.max_concurrency,
            self.analysis.wallets.len(),
            self.model
                .weights
                .iter()
                .zip(FEATURE_NAMES)
                .map(|(w, name)| format!("{}={}", name, w))
                .collect::<Vec<_>>()
                .join(", "),
            self.model.bias,
        )
    }
}

/// Mask a credential for display, keeping the first 4 characters
fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        "(not set)".to_string()
    } else if secret.chars().count() <= 8 {
        "***".to_string()
    } else {
        let prefix: String = secret.chars().take(4).collect();
        format!("{}***", prefix)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            helius: HeliusConfig {
                api_key: String::new(),
                transactions_api_key: None,
                base_url: default_base_url(),
                timeout_ms: default_timeout_ms(),
            },
            analysis: AnalysisConfig::default(),
            model: ModelConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.helius.api_key = "test-key-123456".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.analysis.tx_limit, 10);
        assert_eq!(config.analysis.top_k, 11);
        assert_eq!(config.helius.base_url, "https://api.helius.xyz");
        assert_eq!(config.model.weights.len(), FEATURE_COUNT);
    }

    #[test]
    fn test_validate_requires_api_key() {
        assert!(Config::default().validate().is_err());
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = valid_config();
        config.analysis.top_k = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.model.weights = vec![1.0, 2.0];
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.model.bias = f64::INFINITY;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.analysis.wallets = vec!["   ".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_transactions_key_fallback() {
        let mut config = valid_config();
        assert_eq!(config.helius.transactions_key(), "test-key-123456");

        config.helius.transactions_api_key = Some(String::new());
        assert_eq!(config.helius.transactions_key(), "test-key-123456");

        config.helius.transactions_api_key = Some("other".to_string());
        assert_eq!(config.helius.transactions_key(), "other");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[helius]
api_key = "file-key-abcdef"
timeout_ms = 2500

[analysis]
top_k = 5
wallets = ["WalletA", "WalletB"]
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.helius.api_key, "file-key-abcdef");
        assert_eq!(config.helius.timeout_ms, 2500);
        assert_eq!(config.analysis.top_k, 5);
        assert_eq!(config.analysis.tx_limit, 10);
        assert_eq!(config.analysis.wallets.len(), 2);
    }

    #[test]
    fn test_masked_display_hides_key() {
        let config = valid_config();
        let shown = config.masked_display();
        assert!(shown.contains("test***"));
        assert!(!shown.contains("test-key-123456"));
        assert!(shown.contains("transfer_count=0.1"));
    }

    #[test]
    fn test_env_overrides_wallet_list() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[helius]\napi_key = \"file-key-abcdef\"").unwrap();

        std::env::set_var("KOL__ANALYSIS__WALLETS", "EnvWalletA,EnvWalletB");
        let loaded = Config::load(file.path());
        std::env::remove_var("KOL__ANALYSIS__WALLETS");

        let config = loaded.unwrap();
        assert_eq!(config.analysis.wallets, vec!["EnvWalletA", "EnvWalletB"]);
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret(""), "(not set)");
        assert_eq!(mask_secret("short"), "***");
        assert_eq!(mask_secret("abcdefghijkl"), "abcd***");
    }
}
