use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{B256, U256};

use shared::models::pool::PoolDescriptor;
use shared::web3::contracts::core::builder::PoolContracts;
use shared::web3::contracts::core::error::ContractError;
use shared::web3::contracts::helpers::utils::DynCallBuilder;
use shared::web3::wallet::{Wallet, WalletProvider};

use crate::notifications::NotificationSink;
use crate::tx::{TxError, TxOperation};

/// Which method variants a pool's deposits and withdrawals route to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultRoute {
    /// ERC-20 deposit asset: `deposit`/`withdraw`.
    Token,
    /// Native chain asset: `depositNative`/`withdrawNative`.
    Native,
}

pub fn vault_route(pool: &PoolDescriptor) -> VaultRoute {
    if pool.is_native_deposit() {
        VaultRoute::Native
    } else {
        VaultRoute::Token
    }
}

/// The signed operations for one pool, each wrapped in its own pending flag.
pub struct PoolOperator {
    pool: PoolDescriptor,
    contracts: PoolContracts<WalletProvider>,
    approve_op: TxOperation,
    deposit_op: TxOperation,
    withdraw_op: TxOperation,
    exit_op: TxOperation,
    claim_op: TxOperation,
}

impl PoolOperator {
    pub fn new(
        pool: PoolDescriptor,
        wallet: Arc<Wallet>,
        sink: Arc<dyn NotificationSink>,
        confirm_timeout: Duration,
    ) -> Result<Self, ContractError> {
        let contracts = PoolContracts::for_pool(&pool, wallet.provider.clone())?;
        let op = |name: &str| {
            TxOperation::new(format!("{name} {}", pool.id), sink.clone(), confirm_timeout)
        };

        Ok(Self {
            approve_op: op("approve"),
            deposit_op: op("deposit"),
            withdraw_op: op("withdraw"),
            exit_op: op("exit"),
            claim_op: op("claim"),
            pool,
            contracts,
        })
    }

    pub fn pool(&self) -> &PoolDescriptor {
        &self.pool
    }

    /// Grants the vault an allowance over the deposit token. Fails for
    /// native-asset pools, which have no token contract to approve.
    pub async fn approve(&self, amount: U256) -> Result<B256, TxError> {
        let token = self.contracts.require_deposit_token(&self.pool.id)?;
        let call = token.build_approve_call(self.contracts.vault.address(), amount)?;
        self.approve_op.execute(|| submit_call(call)).await
    }

    /// Deposits `amount` of the pool's asset, routing to the native method
    /// variant whenever the pool has no deposit token address.
    pub async fn deposit(&self, amount: U256) -> Result<B256, TxError> {
        if let Some(cap) = self.pool.deposit_cap() {
            if amount > cap {
                return Err(TxError::DepositCapExceeded { amount, cap });
            }
        }

        let call = match vault_route(&self.pool) {
            VaultRoute::Native => self.contracts.vault.build_deposit_native_call(amount)?,
            VaultRoute::Token => self.contracts.vault.build_deposit_call(amount)?,
        };
        self.deposit_op.execute(|| submit_call(call)).await
    }

    pub async fn withdraw(&self, shares: U256) -> Result<B256, TxError> {
        let call = match vault_route(&self.pool) {
            VaultRoute::Native => self.contracts.vault.build_withdraw_native_call(shares)?,
            VaultRoute::Token => self.contracts.vault.build_withdraw_call(shares)?,
        };
        self.withdraw_op.execute(|| submit_call(call)).await
    }

    /// Withdraws the full stake and claims outstanding rewards.
    pub async fn exit(&self) -> Result<B256, TxError> {
        let call = self.contracts.vault.build_exit_call()?;
        self.exit_op.execute(|| submit_call(call)).await
    }

    /// Claims accrued rewards, leaving the stake in place.
    pub async fn claim(&self) -> Result<B256, TxError> {
        let call = self.contracts.vault.build_get_reward_call()?;
        self.claim_op.execute(|| submit_call(call)).await
    }

    pub fn is_approve_pending(&self) -> bool {
        self.approve_op.is_pending()
    }

    pub fn is_deposit_pending(&self) -> bool {
        self.deposit_op.is_pending()
    }

    pub fn is_withdraw_pending(&self) -> bool {
        self.withdraw_op.is_pending()
    }

    pub fn is_exit_pending(&self) -> bool {
        self.exit_op.is_pending()
    }

    pub fn is_claim_pending(&self) -> bool {
        self.claim_op.is_pending()
    }
}

/// Broadcasts a prepared call and splits the result into the submitted hash
/// and a future resolving on confirmation.
async fn submit_call(
    call: DynCallBuilder<'_, WalletProvider>,
) -> Result<(B256, impl Future<Output = Result<B256, TxError>>), TxError> {
    let pending = call
        .send()
        .await
        .map_err(|e| TxError::Submit(e.to_string()))?;
    let hash = *pending.tx_hash();
    let confirmation = async move {
        pending
            .watch()
            .await
            .map_err(|e| TxError::Confirm(e.to_string()))
    };
    Ok((hash, confirmation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::MemorySink;
    use shared::models::pool::default_pools;
    use url::Url;

    const TEST_KEY: &str = "0xdbda1821b80551c9d65939329250298aa3472ba22feea921c0cf5d620ea67b97";

    fn test_wallet() -> Arc<Wallet> {
        Arc::new(
            Wallet::new(TEST_KEY, Url::parse("http://localhost:8545").unwrap()).unwrap(),
        )
    }

    fn operator(pool: PoolDescriptor) -> PoolOperator {
        PoolOperator::new(
            pool,
            test_wallet(),
            MemorySink::new(),
            Duration::from_secs(1),
        )
        .unwrap()
    }

    fn native_pool() -> PoolDescriptor {
        default_pools().into_iter().find(|p| p.id == "usdc").unwrap()
    }

    fn token_pool() -> PoolDescriptor {
        default_pools().into_iter().find(|p| p.id == "usdt").unwrap()
    }

    #[test]
    fn empty_token_address_routes_to_native_methods() {
        assert_eq!(vault_route(&native_pool()), VaultRoute::Native);
        assert_eq!(vault_route(&token_pool()), VaultRoute::Token);
    }

    #[tokio::test]
    async fn approve_on_native_pool_fails_without_submitting() {
        let op = operator(native_pool());
        let result = op.approve(U256::from(1u64)).await;
        assert!(matches!(
            result,
            Err(TxError::Contract(ContractError::MissingDepositToken(_)))
        ));
        assert!(!op.is_approve_pending());
    }

    #[tokio::test]
    async fn deposit_above_cap_is_rejected_before_submission() {
        let mut pool = token_pool();
        pool.deposit_limit = U256::from(1_000u64);
        let op = operator(pool);

        let result = op.deposit(U256::from(1_001u64)).await;
        assert!(matches!(result, Err(TxError::DepositCapExceeded { .. })));
        assert!(!op.is_deposit_pending());
    }

    #[test]
    fn operations_start_idle() {
        let op = operator(token_pool());
        assert!(!op.is_approve_pending());
        assert!(!op.is_deposit_pending());
        assert!(!op.is_withdraw_pending());
        assert!(!op.is_exit_pending());
        assert!(!op.is_claim_pending());
    }
}
