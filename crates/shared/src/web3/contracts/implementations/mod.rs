pub mod erc20_contract;
pub mod vault_contract;
