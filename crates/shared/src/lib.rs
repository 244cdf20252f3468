pub mod models;
pub mod web3;
