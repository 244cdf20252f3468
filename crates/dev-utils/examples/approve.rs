use alloy::primitives::U256;
use clap::Parser;
use dev_utils::{load_registry, parse_units};
use eyre::{eyre, Result};
use shared::web3::contracts::core::builder::PoolContracts;
use shared::web3::wallet::Wallet;
use std::path::PathBuf;
use url::Url;

#[derive(Parser)]
struct Args {
    /// Pool id whose vault gets the allowance
    #[arg(short = 'p', long)]
    pool: String,

    /// Human amount to approve, e.g. "100.5". Unlimited when omitted.
    #[arg(short = 'a', long)]
    amount: Option<String>,

    /// Private key for transaction signing
    #[arg(short = 'k', long)]
    key: String,

    /// RPC URL
    #[arg(short = 'r', long)]
    rpc_url: String,

    /// Pool registry file (TOML)
    #[arg(long)]
    pools_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let wallet = Wallet::new(&args.key, Url::parse(&args.rpc_url)?).unwrap();

    let registry = load_registry(args.pools_file.as_deref())?;
    let pool = registry
        .get(&args.pool)
        .ok_or_else(|| eyre!("unknown pool: {}", args.pool))?;

    let contracts = PoolContracts::for_pool(pool, wallet.provider.clone()).unwrap();
    let token = contracts
        .deposit_token
        .as_ref()
        .ok_or_else(|| eyre!("pool {} deposits the native asset, nothing to approve", pool.id))?;

    let amount = match &args.amount {
        Some(raw) => parse_units(raw, pool.token_decimals)?,
        None => U256::MAX,
    };

    let tx = token.approve(contracts.vault.address(), amount).await.unwrap();
    println!("approve confirmed: {tx}");

    Ok(())
}
