use clap::Parser;
use eyre::Result;
use shared::web3::wallet::Wallet;
use url::Url;

#[derive(Parser)]
struct Args {
    /// Private key of the wallet to unstick
    #[arg(short = 'k', long)]
    key: String,

    /// RPC URL
    #[arg(short = 'r', long)]
    rpc_url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let wallet = Wallet::new(&args.key, Url::parse(&args.rpc_url)?).unwrap();

    let had_pending = wallet.clear_pending_transactions().await.unwrap();
    if had_pending {
        println!("replacement transactions sent for all stuck nonces");
    } else {
        println!("no pending transactions");
    }

    Ok(())
}
