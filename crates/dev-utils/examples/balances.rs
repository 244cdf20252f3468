use clap::Parser;
use dev_utils::load_registry;
use eyre::{eyre, Result};
use shared::web3::contracts::core::builder::PoolContracts;
use shared::web3::wallet::Wallet;
use std::path::PathBuf;
use url::Url;

#[derive(Parser)]
struct Args {
    /// Pool id to inspect
    #[arg(short = 'p', long)]
    pool: String,

    /// Private key of the wallet to inspect
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
    let address = wallet.address();

    let deposit_balance = match &contracts.deposit_token {
        Some(token) => token.balance_of(address).await.unwrap(),
        None => wallet.get_balance().await.unwrap(),
    };
    let staked = contracts.vault.staked_balance_of(address).await.unwrap();
    let earned = contracts.vault.earned(address).await.unwrap();
    let share_price = contracts.vault.price_per_full_share().await.unwrap();

    println!("pool:         {}", pool.id);
    println!("wallet:       {address}");
    println!("{} balance: {deposit_balance}", pool.token);
    println!("staked:       {staked}");
    println!("earned:       {earned} {}", pool.earned_token);
    println!("share price:  {share_price}");

    if !pool.is_native_deposit() {
        let token = contracts.deposit_token.as_ref().unwrap();
        let allowance = token
            .allowance(address, contracts.vault.address())
            .await
            .unwrap();
        println!("allowance:    {allowance}");
    }

    Ok(())
}
