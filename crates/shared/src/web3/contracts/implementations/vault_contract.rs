use crate::web3::contracts::core::contract::Contract;
use crate::web3::contracts::core::error::ContractResult;
use crate::web3::contracts::helpers::utils::{decode_uint, DynCallBuilder};
use crate::web3::wallet::WalletProvider;
use alloy::primitives::{Address, B256, U256};

/// A staking vault: accepts deposits of one asset, issues receipt shares, and
/// accrues rewards claimable through `getReward`. Native-asset pools use the
/// `depositNative`/`withdrawNative` method variants.
#[derive(Clone)]
pub struct YieldVault<P: alloy_provider::Provider> {
    pub instance: Contract<P>,
}

impl<P: alloy_provider::Provider> YieldVault<P> {
    pub fn new(address: Address, provider: P, abi_file_path: &str) -> Self {
        let instance = Contract::new(address, provider, abi_file_path);
        Self { instance }
    }

    pub fn address(&self) -> Address {
        self.instance.address()
    }

    /// Receipt-share balance held by `account`.
    pub async fn staked_balance_of(&self, account: Address) -> ContractResult<U256> {
        let result = self
            .instance
            .instance()
            .function("balanceOf", &[account.into()])?
            .call()
            .await?;
        decode_uint(&result, "balanceOf")
    }

    /// Rewards accrued by `account` and not yet claimed.
    pub async fn earned(&self, account: Address) -> ContractResult<U256> {
        let result = self
            .instance
            .instance()
            .function("earned", &[account.into()])?
            .call()
            .await?;
        decode_uint(&result, "earned")
    }

    /// Deposit-asset value of one full receipt share.
    pub async fn price_per_full_share(&self) -> ContractResult<U256> {
        let result = self
            .instance
            .instance()
            .function("getPricePerFullShare", &[])?
            .call()
            .await?;
        decode_uint(&result, "getPricePerFullShare")
    }
}

impl YieldVault<WalletProvider> {
    pub fn build_deposit_call(
        &self,
        amount: U256,
    ) -> ContractResult<DynCallBuilder<'_, WalletProvider>> {
        let call = self
            .instance
            .instance()
            .function("deposit", &[amount.into()])?;
        Ok(call)
    }

    /// Payable variant: the deposit amount travels as transaction value.
    pub fn build_deposit_native_call(
        &self,
        amount: U256,
    ) -> ContractResult<DynCallBuilder<'_, WalletProvider>> {
        let call = self
            .instance
            .instance()
            .function("depositNative", &[])?
            .value(amount);
        Ok(call)
    }

    pub fn build_withdraw_call(
        &self,
        shares: U256,
    ) -> ContractResult<DynCallBuilder<'_, WalletProvider>> {
        let call = self
            .instance
            .instance()
            .function("withdraw", &[shares.into()])?;
        Ok(call)
    }

    pub fn build_withdraw_native_call(
        &self,
        shares: U256,
    ) -> ContractResult<DynCallBuilder<'_, WalletProvider>> {
        let call = self
            .instance
            .instance()
            .function("withdrawNative", &[shares.into()])?;
        Ok(call)
    }

    /// Withdraws the full stake and claims outstanding rewards in one call.
    pub fn build_exit_call(&self) -> ContractResult<DynCallBuilder<'_, WalletProvider>> {
        let call = self.instance.instance().function("exit", &[])?;
        Ok(call)
    }

    pub fn build_get_reward_call(&self) -> ContractResult<DynCallBuilder<'_, WalletProvider>> {
        let call = self.instance.instance().function("getReward", &[])?;
        Ok(call)
    }

    pub async fn deposit(&self, amount: U256) -> ContractResult<B256> {
        let tx = self.build_deposit_call(amount)?.send().await?.watch().await?;
        Ok(tx)
    }

    pub async fn deposit_native(&self, amount: U256) -> ContractResult<B256> {
        let tx = self
            .build_deposit_native_call(amount)?
            .send()
            .await?
            .watch()
            .await?;
        Ok(tx)
    }

    pub async fn withdraw(&self, shares: U256) -> ContractResult<B256> {
        let tx = self.build_withdraw_call(shares)?.send().await?.watch().await?;
        Ok(tx)
    }

    pub async fn withdraw_native(&self, shares: U256) -> ContractResult<B256> {
        let tx = self
            .build_withdraw_native_call(shares)?
            .send()
            .await?
            .watch()
            .await?;
        Ok(tx)
    }

    pub async fn exit(&self) -> ContractResult<B256> {
        let tx = self.build_exit_call()?.send().await?.watch().await?;
        Ok(tx)
    }

    pub async fn get_reward(&self) -> ContractResult<B256> {
        let tx = self.build_get_reward_call()?.send().await?.watch().await?;
        Ok(tx)
    }
}
