use clap::Parser;
use dev_utils::{load_registry, parse_units};
use eyre::{eyre, Result};
use shared::web3::contracts::core::builder::PoolContracts;
use shared::web3::wallet::Wallet;
use std::path::PathBuf;
use url::Url;

#[derive(Parser)]
struct Args {
    /// Pool id to deposit into
    #[arg(short = 'p', long)]
    pool: String,

    /// Human amount to deposit, e.g. "1.5"
    #[arg(short = 'a', long)]
    amount: String,

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
    let amount = parse_units(&args.amount, pool.token_decimals)?;

    let tx = if pool.is_native_deposit() {
        contracts.vault.deposit_native(amount).await.unwrap()
    } else {
        contracts.vault.deposit(amount).await.unwrap()
    };
    println!("deposit confirmed: {tx}");

    Ok(())
}
