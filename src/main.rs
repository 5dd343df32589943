//! KOL Scanner - common holdings and trend scores for a group of Solana wallets
//!
//! Reads balances and recent transactions from Helius. Read-only: nothing
//! here signs or sends transactions.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::error;

// Use the library crate
use kol_scanner::cli::commands;
use kol_scanner::config::Config;

/// KOL Scanner - wallet group overlap and trend scoring
#[derive(Parser)]
#[command(name = "kol")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "kol.toml")]
    config: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct WalletArgs {
    /// Wallet addresses (newline/comma separated lists also accepted)
    wallets: Vec<String>,

    /// Read additional wallet addresses from a file, one per line
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Print JSON instead of tables
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Common holdings and trend scores
    Analyze {
        #[command(flatten)]
        input: WalletArgs,
    },

    /// Ranked tokens held by every wallet
    Holdings {
        #[command(flatten)]
        input: WalletArgs,

        /// Ranked list size (overrides analysis.top_k)
        #[arg(long)]
        top: Option<usize>,
    },

    /// Per-wallet trend scores
    Trend {
        #[command(flatten)]
        input: WalletArgs,
    },

    /// Show current configuration (secrets masked)
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize tracing (stderr, so --json output stays clean)
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("kol_scanner=info".parse()?);
    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .init();
    }

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    // Execute command
    let result = match cli.command {
        Commands::Analyze { input } => match wallets(&input, &config) {
            Ok(wallets) => commands::analyze(&config, wallets, input.json).await,
            Err(e) => Err(e),
        },
        Commands::Holdings { input, top } => match wallets(&input, &config) {
            Ok(wallets) => commands::holdings(&config, wallets, top, input.json).await,
            Err(e) => Err(e),
        },
        Commands::Trend { input } => match wallets(&input, &config) {
            Ok(wallets) => commands::trend(&config, wallets, input.json).await,
            Err(e) => Err(e),
        },
        Commands::Config => commands::show_config(&config),
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn wallets(input: &WalletArgs, config: &Config) -> Result<Vec<kol_scanner::WalletAddress>> {
    commands::resolve_wallets(&input.wallets, input.file.as_deref(), config)
}
