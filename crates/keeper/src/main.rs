use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use log::{error, info, LevelFilter};
use url::Url;

use alloy::primitives::U256;
use shared::models::pool::{default_pools, PoolRegistry};
use shared::web3::wallet::Wallet;

use keeper::monitor::{MonitorConfig, PortfolioMonitor, ReadFailurePolicy};
use keeper::notifications::{LogSink, NotificationSink, WebhookSink};
use keeper::ops::PoolOperator;
use keeper::store::PortfolioStore;

#[derive(Parser)]
#[command(name = "keeper", about = "Yield vault portfolio keeper")]
struct Cli {
    /// RPC URL
    #[arg(short = 'r', long, default_value = "http://localhost:8545")]
    rpc_url: String,

    /// Private key for balance queries and transaction signing
    #[arg(short = 'k', long)]
    private_key: String,

    /// Pool registry file (TOML). Falls back to the built-in pool set.
    #[arg(short = 'p', long)]
    pools: Option<PathBuf>,

    /// Webhook URL for transaction notifications; logs locally when unset
    #[arg(long)]
    webhook_url: Option<String>,

    /// Transaction confirmation timeout in seconds
    #[arg(long, default_value = "180")]
    confirm_timeout: u64,

    /// Log level
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the portfolio monitor until interrupted
    Run {
        /// Balance and allowance poll interval in seconds
        #[arg(long, default_value = "10")]
        balance_interval: u64,

        /// Staked/earned poll interval in seconds
        #[arg(long, default_value = "15")]
        earnings_interval: u64,

        /// Share price poll interval in seconds
        #[arg(long, default_value = "120")]
        share_price_interval: u64,

        /// What to do with stored values when a read call fails: retain | reset
        #[arg(long, default_value = "retain")]
        on_read_failure: String,

        /// Portfolio summary log interval in seconds
        #[arg(long, default_value = "60")]
        summary_interval: u64,
    },
    /// Approve the vault to spend the deposit token
    Approve {
        #[arg(long)]
        pool: String,
        /// Amount in chain-native units; unlimited when omitted
        #[arg(long)]
        amount: Option<String>,
    },
    /// Deposit into a pool
    Deposit {
        #[arg(long)]
        pool: String,
        /// Amount in chain-native units
        #[arg(long)]
        amount: String,
    },
    /// Withdraw receipt shares from a pool
    Withdraw {
        #[arg(long)]
        pool: String,
        /// Shares in chain-native units
        #[arg(long)]
        shares: String,
    },
    /// Withdraw the full stake and claim rewards
    Exit {
        #[arg(long)]
        pool: String,
    },
    /// Claim accrued rewards
    Claim {
        #[arg(long)]
        pool: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.log_level.as_str() {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    let registry = match &cli.pools {
        Some(path) => PoolRegistry::load(path)?,
        None => PoolRegistry::new(default_pools())?,
    };
    info!("Loaded {} pools", registry.len());

    let rpc_url: Url = cli.rpc_url.parse()?;
    let wallet = Arc::new(Wallet::new(&cli.private_key, rpc_url).unwrap_or_else(|err| {
        error!("Error creating wallet: {err:?}");
        std::process::exit(1);
    }));
    info!("Keeper wallet address: {}", wallet.address());

    let sink: Arc<dyn NotificationSink> = match &cli.webhook_url {
        Some(url) => Arc::new(WebhookSink::new(url.clone())),
        None => Arc::new(LogSink),
    };
    let confirm_timeout = Duration::from_secs(cli.confirm_timeout);
    let registry = Arc::new(registry);

    match cli.command {
        Command::Run {
            balance_interval,
            earnings_interval,
            share_price_interval,
            on_read_failure,
            summary_interval,
        } => {
            let failure_policy = match on_read_failure.as_str() {
                "reset" => ReadFailurePolicy::ResetValue,
                "retain" => ReadFailurePolicy::RetainLastValue,
                other => bail!("unknown read-failure policy: {other}"),
            };
            let config = MonitorConfig {
                balance_interval: Duration::from_secs(balance_interval),
                earnings_interval: Duration::from_secs(earnings_interval),
                share_price_interval: Duration::from_secs(share_price_interval),
                failure_policy,
            };

            let store = Arc::new(PortfolioStore::new(&registry));
            let monitor =
                PortfolioMonitor::new(registry.clone(), store.clone(), wallet.clone(), config);
            monitor.start()?;

            let summary_registry = registry.clone();
            let summary_store = store.clone();
            let summary = tokio::spawn(async move {
                loop {
                    tokio::time::sleep(Duration::from_secs(summary_interval)).await;
                    log_summary(&summary_registry, &summary_store);
                }
            });

            tokio::signal::ctrl_c().await?;
            info!("Shutting down");
            summary.abort();
            monitor.stop();
        }
        Command::Approve { pool, amount } => {
            let operator = operator_for(&registry, &pool, wallet, sink, confirm_timeout)?;
            let amount = match amount {
                Some(raw) => parse_amount(&raw)?,
                None => U256::MAX,
            };
            let hash = operator.approve(amount).await?;
            println!("approve {pool}: {hash}");
        }
        Command::Deposit { pool, amount } => {
            let operator = operator_for(&registry, &pool, wallet, sink, confirm_timeout)?;
            let hash = operator.deposit(parse_amount(&amount)?).await?;
            println!("deposit {pool}: {hash}");
        }
        Command::Withdraw { pool, shares } => {
            let operator = operator_for(&registry, &pool, wallet, sink, confirm_timeout)?;
            let hash = operator.withdraw(parse_amount(&shares)?).await?;
            println!("withdraw {pool}: {hash}");
        }
        Command::Exit { pool } => {
            let operator = operator_for(&registry, &pool, wallet, sink, confirm_timeout)?;
            let hash = operator.exit().await?;
            println!("exit {pool}: {hash}");
        }
        Command::Claim { pool } => {
            let operator = operator_for(&registry, &pool, wallet, sink, confirm_timeout)?;
            let hash = operator.claim().await?;
            println!("claim {pool}: {hash}");
        }
    }

    Ok(())
}

fn operator_for(
    registry: &PoolRegistry,
    pool_id: &str,
    wallet: Arc<Wallet>,
    sink: Arc<dyn NotificationSink>,
    confirm_timeout: Duration,
) -> Result<PoolOperator> {
    let Some(pool) = registry.get(pool_id) else {
        bail!("unknown pool: {pool_id}");
    };
    Ok(PoolOperator::new(
        pool.clone(),
        wallet,
        sink,
        confirm_timeout,
    )?)
}

fn parse_amount(raw: &str) -> Result<U256> {
    Ok(raw.parse::<U256>()?)
}

fn log_summary(registry: &PoolRegistry, store: &PortfolioStore) {
    for pool in registry.iter() {
        let balance = store
            .token_balance(pool.chain_id, &pool.token)
            .map(|entry| entry.balance)
            .unwrap_or_default();
        let Some(snapshot) = store.pool(&pool.id) else {
            continue;
        };
        info!(
            "pool {}: balance {} {} | staked {} | earned {} {} | allowance {} | share price {}{}",
            pool.id,
            balance,
            pool.token,
            snapshot.staked,
            snapshot.earned,
            pool.earned_token,
            snapshot.allowance,
            snapshot.share_price,
            snapshot
                .apy
                .map(|apy| format!(" | apy {apy:.2}%"))
                .unwrap_or_default(),
        );
    }
}
