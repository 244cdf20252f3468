use crate::web3::contracts::core::contract::Contract;
use crate::web3::contracts::core::error::ContractResult;
use crate::web3::contracts::helpers::utils::{decode_uint, DynCallBuilder};
use crate::web3::wallet::WalletProvider;
use alloy::primitives::{Address, B256, U256};

/// The deposit-token side of a pool: balance, allowance toward the vault,
/// and approval.
#[derive(Clone)]
pub struct Erc20Token<P: alloy_provider::Provider> {
    pub instance: Contract<P>,
}

impl<P: alloy_provider::Provider> Erc20Token<P> {
    pub fn new(address: Address, provider: P, abi_file_path: &str) -> Self {
        let instance = Contract::new(address, provider, abi_file_path);
        Self { instance }
    }

    pub fn address(&self) -> Address {
        self.instance.address()
    }

    pub async fn balance_of(&self, owner: Address) -> ContractResult<U256> {
        let result = self
            .instance
            .instance()
            .function("balanceOf", &[owner.into()])?
            .call()
            .await?;
        decode_uint(&result, "balanceOf")
    }

    pub async fn allowance(&self, owner: Address, spender: Address) -> ContractResult<U256> {
        let result = self
            .instance
            .instance()
            .function("allowance", &[owner.into(), spender.into()])?
            .call()
            .await?;
        decode_uint(&result, "allowance")
    }
}

impl Erc20Token<WalletProvider> {
    pub fn build_approve_call(
        &self,
        spender: Address,
        amount: U256,
    ) -> ContractResult<DynCallBuilder<'_, WalletProvider>> {
        let call = self
            .instance
            .instance()
            .function("approve", &[spender.into(), amount.into()])?;
        Ok(call)
    }

    /// Approves `spender` for `amount` and waits for the approval to mine.
    pub async fn approve(&self, spender: Address, amount: U256) -> ContractResult<B256> {
        let tx = self
            .build_approve_call(spender, amount)?
            .send()
            .await?
            .watch()
            .await?;

        Ok(tx)
    }
}
