use alloy::primitives::Address;

use crate::models::pool::PoolDescriptor;
use crate::web3::contracts::{
    core::error::ContractError,
    implementations::{erc20_contract::Erc20Token, vault_contract::YieldVault},
};

/// The contract handles for one pool: the vault itself plus, for non-native
/// pools, the ERC-20 deposit token.
#[derive(Clone)]
pub struct PoolContracts<P: alloy_provider::Provider> {
    pub deposit_token: Option<Erc20Token<P>>,
    pub vault: YieldVault<P>,
}

pub struct ContractBuilder<P: alloy_provider::Provider + Clone> {
    provider: P,
    deposit_token: Option<Erc20Token<P>>,
    vault: Option<YieldVault<P>>,
}

impl<P: alloy_provider::Provider + Clone> ContractBuilder<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            deposit_token: None,
            vault: None,
        }
    }

    pub fn with_deposit_token(mut self, address: Address) -> Self {
        self.deposit_token = Some(Erc20Token::new(
            address,
            self.provider.clone(),
            "erc20.json",
        ));
        self
    }

    pub fn with_vault(mut self, address: Address) -> Self {
        self.vault = Some(YieldVault::new(address, self.provider.clone(), "vault.json"));
        self
    }

    pub fn build(self) -> Result<PoolContracts<P>, ContractError> {
        Ok(PoolContracts {
            vault: match self.vault {
                Some(vault) => vault,
                None => return Err(ContractError::NotInitialized("vault")),
            },
            deposit_token: self.deposit_token,
        })
    }
}

impl<P: alloy_provider::Provider + Clone> PoolContracts<P> {
    /// Builds the handles a descriptor needs: the vault always, the deposit
    /// token only when the pool is not a native-asset pool.
    pub fn for_pool(pool: &PoolDescriptor, provider: P) -> Result<Self, ContractError> {
        let mut builder = ContractBuilder::new(provider).with_vault(pool.earn_contract_address);
        if let Some(token_address) = pool.token_address {
            builder = builder.with_deposit_token(token_address);
        }
        builder.build()
    }

    /// The deposit token contract, or an error naming the pool for native pools.
    pub fn require_deposit_token(&self, pool_id: &str) -> Result<&Erc20Token<P>, ContractError> {
        self.deposit_token
            .as_ref()
            .ok_or_else(|| ContractError::MissingDepositToken(pool_id.to_string()))
    }
}
