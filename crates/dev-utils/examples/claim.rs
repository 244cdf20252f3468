use clap::Parser;
use dev_utils::load_registry;
use eyre::{eyre, Result};
use shared::web3::contracts::core::builder::PoolContracts;
use shared::web3::wallet::Wallet;
use std::path::PathBuf;
use url::Url;

#[derive(Parser)]
struct Args {
    /// Pool id to claim rewards from
    #[arg(short = 'p', long)]
    pool: String,

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

    let tx = contracts.vault.get_reward().await.unwrap();
    println!("claim confirmed: {tx} ({} rewards)", pool.earned_token);

    Ok(())
}
