pub mod contracts;
pub mod wallet;

pub use contracts::core::builder::PoolContracts;
pub use wallet::{Wallet, WalletProvider};
