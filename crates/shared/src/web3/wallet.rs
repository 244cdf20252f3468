use std::time::Duration;

use alloy::eips::{BlockId, BlockNumberOrTag};
use alloy::network::TransactionBuilder;
use alloy::primitives::Address;
use alloy::rpc::types::TransactionRequest;
use alloy::{
    network::EthereumWallet,
    primitives::U256,
    providers::fillers::{
        BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller, WalletFiller,
    },
    providers::{Identity, Provider, ProviderBuilder, RootProvider},
    signers::local::PrivateKeySigner,
};
use url::Url;

pub type WalletProvider = FillProvider<
    JoinFill<
        JoinFill<
            Identity,
            JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
        >,
        WalletFiller<EthereumWallet>,
    >,
    RootProvider,
>;

/// The connected wallet: a signing key plus a filler provider that attaches
/// gas, nonce, chain id, and signature to every outgoing transaction.
pub struct Wallet {
    pub wallet: EthereumWallet,
    pub signer: PrivateKeySigner,
    pub provider: WalletProvider,
}

impl Wallet {
    pub fn new(private_key: &str, provider_url: Url) -> Result<Self, Box<dyn std::error::Error>> {
        let signer: PrivateKeySigner = private_key.parse()?;
        let wallet = EthereumWallet::from(signer.clone());

        let provider = ProviderBuilder::new()
            .wallet(wallet.clone())
            .on_http(provider_url);

        Ok(Self {
            wallet,
            signer,
            provider,
        })
    }

    pub fn address(&self) -> Address {
        self.wallet.default_signer().address()
    }

    /// Native-asset balance of the wallet address.
    pub async fn get_balance(&self) -> Result<U256, Box<dyn std::error::Error>> {
        let address = self.address();
        let balance = self.provider.get_balance(address).await?;

        Ok(balance)
    }

    /// Replaces the transaction occupying `nonce` with a zero-value transfer
    /// to self at bumped fees.
    async fn cancel_nonce(
        &self,
        nonce: u64,
        wait_for_confirmation: bool,
    ) -> Result<(), Box<dyn std::error::Error>> {
        const PRIORITY_FEE_BUMP_WEI: u128 = 1_000_000;
        const MAX_FEE_BUMP_WEI: u128 = 10_000_000;
        const REPLACEMENT_WATCH_TIMEOUT: Duration = Duration::from_secs(180);

        let address = self.address();

        let fees = self.provider.estimate_eip1559_fees().await.map_err(|e| {
            format!("replacement for nonce {nonce}: EIP-1559 fee estimation failed: {e}")
        })?;
        let priority_fee = fees.max_priority_fee_per_gas + PRIORITY_FEE_BUMP_WEI;
        let max_fee = fees.max_fee_per_gas + priority_fee + MAX_FEE_BUMP_WEI;

        let tx_request = TransactionRequest::default()
            .with_to(address)
            .with_value(U256::ZERO)
            .with_nonce(nonce)
            .with_gas_limit(21_000)
            .with_max_fee_per_gas(max_fee)
            .with_max_priority_fee_per_gas(priority_fee);

        let pending_tx = self.provider.send_transaction(tx_request).await?;
        let tx_hash = *pending_tx.tx_hash();
        log::info!("Replacement transaction for nonce {nonce} sent: {tx_hash}");

        if !wait_for_confirmation {
            return Ok(());
        }

        match tokio::time::timeout(REPLACEMENT_WATCH_TIMEOUT, pending_tx.watch()).await {
            Ok(Ok(confirmed)) => {
                log::info!("Replacement transaction for nonce {nonce} confirmed: {confirmed}");
                Ok(())
            }
            Ok(Err(e)) => {
                log::error!("Error watching replacement transaction {tx_hash}: {e}");
                Err(Box::new(e))
            }
            Err(_) => Err(format!(
                "timed out waiting for replacement of nonce {nonce} after {REPLACEMENT_WATCH_TIMEOUT:?}"
            )
            .into()),
        }
    }

    /// Cancels every transaction stuck between the latest accepted nonce and
    /// the pending nonce. Returns true when any replacements were sent.
    pub async fn clear_pending_transactions(&self) -> Result<bool, Box<dyn std::error::Error>> {
        let address = self.address();

        let latest_nonce = self.provider.get_transaction_count(address).await?;
        let pending_nonce = self
            .provider
            .get_transaction_count(address)
            .block_id(BlockId::Number(BlockNumberOrTag::Pending))
            .await?;

        if pending_nonce <= latest_nonce {
            return Ok(false);
        }

        log::info!(
            "Pending transactions detected: next accepted nonce {latest_nonce}, pending nonce {pending_nonce}"
        );

        for nonce in latest_nonce..pending_nonce {
            if let Err(e) = self.cancel_nonce(nonce, false).await {
                // A nonce that was mined in the meantime is fine to skip.
                log::warn!("Failed to replace transaction at nonce {nonce}: {e}");
            }
        }

        Ok(true)
    }
}
