//! CLI command implementations

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, warn};

use crate::config::Config;
use crate::holdings::CommonHoldings;
use crate::orchestrator::Orchestrator;
use crate::trend::{ScoreOutcome, WalletScore};
use crate::types::{parse_wallet_list, WalletAddress, WalletWarning};

/// Collect wallets from arguments, then `--file`, then the config default
pub fn resolve_wallets(
    args: &[String],
    file: Option<&Path>,
    config: &Config,
) -> Result<Vec<WalletAddress>> {
    let mut text = args.join("\n");

    if let Some(path) = file {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read wallet file {}", path.display()))?;
        text.push('\n');
        text.push_str(&contents);
    }

    if text.trim().is_empty() {
        text = config.analysis.wallets.join("\n");
    }

    let wallets = parse_wallet_list(&text);
    if wallets.is_empty() {
        anyhow::bail!("No wallets provided: pass addresses, --file, or set analysis.wallets");
    }
    Ok(wallets)
}

/// Full analysis: common holdings plus trend scores
pub async fn analyze(config: &Config, wallets: Vec<WalletAddress>, json: bool) -> Result<()> {
    info!("Analyzing {} wallets...", wallets.len());

    let orchestrator = Orchestrator::from_config(config)?;
    let report = orchestrator.analyze(&wallets).await?;

    if report.is_degraded() {
        warn!(
            degraded = report.warnings.len(),
            "Analysis completed with degraded wallets"
        );
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("\n=== KOL WALLET ANALYSIS ({}) ===", report.generated_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("Wallets: {}", report.wallets.len());

    print_holdings(&report.holdings, config.analysis.top_k);
    print_scores(&report.scores);
    print_warnings(&report.warnings);

    Ok(())
}

/// Common holdings only
pub async fn holdings(
    config: &Config,
    wallets: Vec<WalletAddress>,
    top: Option<usize>,
    json: bool,
) -> Result<()> {
    let mut config = config.clone();
    if let Some(top) = top {
        if top == 0 {
            anyhow::bail!("--top must be positive");
        }
        config.analysis.top_k = top;
    }

    let orchestrator = Orchestrator::from_config(&config)?;
    let report = orchestrator
        .aggregator()
        .compute_common_and_ranked(&wallets)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_holdings(&report.holdings, config.analysis.top_k);
    print_warnings(&report.warnings);

    Ok(())
}

/// Trend scores only
pub async fn trend(config: &Config, wallets: Vec<WalletAddress>, json: bool) -> Result<()> {
    let orchestrator = Orchestrator::from_config(config)?;
    let scores = orchestrator.scorer().score_all(&wallets).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&scores)?);
        return Ok(());
    }

    print_scores(&scores);
    let warnings: Vec<_> = scores.iter().filter_map(WalletScore::warning).collect();
    print_warnings(&warnings);

    Ok(())
}

/// Show current configuration (secrets masked)
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", config.masked_display());
    Ok(())
}

fn print_holdings(holdings: &CommonHoldings, top_k: usize) {
    println!("\n=== COMMON HOLDINGS (top {}) ===\n", top_k);

    if holdings.is_empty() {
        warn!("No common holdings found");
        println!("No common holdings. A wallet fetch may have failed or the wallets share no tokens.");
        return;
    }

    println!("{:>4}  {:<46} {:>20}", "#", "Token", "Total");
    for (rank, holding) in holdings.ranked.iter().enumerate() {
        println!(
            "{:>4}  {:<46} {:>20.4}",
            rank + 1,
            holding.token,
            holding.total
        );
    }
    if holdings.common.len() > holdings.ranked.len() {
        println!(
            "\n({} common tokens, showing {})",
            holdings.common.len(),
            holdings.ranked.len()
        );
    }
}

fn print_scores(scores: &[WalletScore]) {
    println!("\n=== TREND SCORES ===\n");

    for score in scores {
        match &score.outcome {
            ScoreOutcome::Scored {
                score: value,
                transactions,
            } => println!("{:<46} {:>8}  ({} txs)", score.wallet, value, transactions),
            ScoreOutcome::Unavailable { reason, .. } => {
                println!("{:<46} {:>8}  ({:?})", score.wallet, "n/a", reason)
            }
        }
    }
}

fn print_warnings(warnings: &[WalletWarning]) {
    if warnings.is_empty() {
        return;
    }

    println!("\n=== WARNINGS ===\n");
    for warning in warnings {
        println!("  {}", warning);
    }
}
