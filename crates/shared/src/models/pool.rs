use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Static description of one vault pool: the asset it accepts, the vault
/// contract holding deposits, and the token it pays rewards in.
///
/// Descriptors are defined in configuration and never change at runtime.
/// A pool whose `token_address` is absent (or an empty string in config)
/// accepts the chain's native asset instead of an ERC-20 token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolDescriptor {
    pub id: String,
    pub name: String,
    /// Symbol of the deposit asset.
    pub token: String,
    #[serde(default, with = "serde_opt_address")]
    pub token_address: Option<Address>,
    pub token_decimals: u8,
    /// Decimals of the vault receipt token used when withdrawing.
    pub itoken_decimals: u8,
    /// Maximum deposit in chain-native units. Zero means unlimited.
    #[serde(default)]
    pub deposit_limit: U256,
    /// Symbol of the reward token.
    pub earned_token: String,
    pub earned_token_address: Address,
    /// The vault contract accepting deposits.
    pub earn_contract_address: Address,
    /// Fallback annual yield shown before any share-price history exists.
    #[serde(default)]
    pub default_apy: String,
    #[serde(default = "default_share_price")]
    pub price_per_full_share: f64,
    #[serde(default = "default_share_price")]
    pub past_price_per_full_share: f64,
    pub chain_id: u64,
}

fn default_share_price() -> f64 {
    1.0
}

impl PoolDescriptor {
    /// True when the pool accepts the native chain asset rather than a token.
    pub fn is_native_deposit(&self) -> bool {
        self.token_address.is_none()
    }

    /// The deposit cap, or `None` when deposits are unlimited.
    pub fn deposit_cap(&self) -> Option<U256> {
        if self.deposit_limit.is_zero() {
            None
        } else {
            Some(self.deposit_limit)
        }
    }
}

/// Accepts an absent field, an empty string, or a hex address.
mod serde_opt_address {
    use alloy::primitives::Address;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Option<Address>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref() {
            None | Some("") => Ok(None),
            Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
        }
    }

    pub(super) fn serialize<S>(value: &Option<Address>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(address) => serializer.serialize_str(&address.to_string()),
            None => serializer.serialize_str(""),
        }
    }
}

#[derive(Debug)]
pub enum RegistryError {
    DuplicatePoolId(String),
    MissingVaultAddress(String),
    MissingRewardToken(String),
    EmptySymbol(String),
    Io(String),
    Parse(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::DuplicatePoolId(id) => write!(f, "duplicate pool id: {id}"),
            RegistryError::MissingVaultAddress(id) => {
                write!(f, "pool {id}: vault contract address is missing or zero")
            }
            RegistryError::MissingRewardToken(id) => {
                write!(f, "pool {id}: reward token address is missing or zero")
            }
            RegistryError::EmptySymbol(id) => write!(f, "pool {id}: token symbol is empty"),
            RegistryError::Io(msg) => write!(f, "failed to read pool file: {msg}"),
            RegistryError::Parse(msg) => write!(f, "failed to parse pool file: {msg}"),
        }
    }
}

impl std::error::Error for RegistryError {}

impl From<std::io::Error> for RegistryError {
    fn from(err: std::io::Error) -> Self {
        RegistryError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for RegistryError {
    fn from(err: toml::de::Error) -> Self {
        RegistryError::Parse(err.to_string())
    }
}

/// Read-only, ordered collection of pool descriptors, validated at load time.
#[derive(Debug, Clone)]
pub struct PoolRegistry {
    pools: Vec<PoolDescriptor>,
}

#[derive(Deserialize)]
struct PoolFile {
    pools: Vec<PoolDescriptor>,
}

impl PoolRegistry {
    /// Validates the descriptors and fails fast on the first violation:
    /// duplicate ids, zero contract addresses, or empty token symbols.
    pub fn new(pools: Vec<PoolDescriptor>) -> Result<Self, RegistryError> {
        let mut seen = HashSet::new();
        for pool in &pools {
            if !seen.insert(pool.id.clone()) {
                return Err(RegistryError::DuplicatePoolId(pool.id.clone()));
            }
            if pool.earn_contract_address == Address::ZERO {
                return Err(RegistryError::MissingVaultAddress(pool.id.clone()));
            }
            if pool.earned_token_address == Address::ZERO {
                return Err(RegistryError::MissingRewardToken(pool.id.clone()));
            }
            if pool.token.is_empty() || pool.earned_token.is_empty() {
                return Err(RegistryError::EmptySymbol(pool.id.clone()));
            }
        }
        Ok(Self { pools })
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, RegistryError> {
        let file: PoolFile = toml::from_str(raw)?;
        Self::new(file.pools)
    }

    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn get(&self, id: &str) -> Option<&PoolDescriptor> {
        self.pools.iter().find(|pool| pool.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PoolDescriptor> {
        self.pools.iter()
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}

/// The pool set shipped with the binary, used when no pool file is given.
pub fn default_pools() -> Vec<PoolDescriptor> {
    fn addr(raw: &str) -> Address {
        raw.parse().expect("static pool address")
    }

    vec![
        PoolDescriptor {
            id: "usdc".to_string(),
            name: "USDC".to_string(),
            token: "USDC".to_string(),
            // Deposits the native chain asset.
            token_address: None,
            token_decimals: 18,
            itoken_decimals: 18,
            deposit_limit: U256::ZERO,
            earned_token: "iUSDC".to_string(),
            earned_token_address: addr("0xaeb98fd0ba5acdc9471ee868a6fdd85ba1f20c6a"),
            earn_contract_address: addr("0xaeb98fd0ba5acdc9471ee868a6fdd85ba1f20c6a"),
            default_apy: "39.54".to_string(),
            price_per_full_share: 1.0,
            past_price_per_full_share: 1.0,
            chain_id: 56,
        },
        PoolDescriptor {
            id: "usdt".to_string(),
            name: "USDT".to_string(),
            token: "USDT".to_string(),
            token_address: Some(addr("0x55d398326f99059ff775485246999027b3197955")),
            token_decimals: 18,
            itoken_decimals: 18,
            deposit_limit: U256::ZERO,
            earned_token: "iUSDT".to_string(),
            earned_token_address: addr("0x1f19d041fdce1b70901008229d77a8b02e315618"),
            earn_contract_address: addr("0x1f19d041fdce1b70901008229d77a8b02e315618"),
            default_apy: "39.54".to_string(),
            price_per_full_share: 1.0,
            past_price_per_full_share: 1.0,
            chain_id: 56,
        },
        PoolDescriptor {
            id: "busd".to_string(),
            name: "BUSD".to_string(),
            token: "BUSD".to_string(),
            token_address: Some(addr("0xe9e7cea3dedca5984780bafc599bd69add087d56")),
            token_decimals: 18,
            itoken_decimals: 18,
            deposit_limit: U256::ZERO,
            earned_token: "iBUSD".to_string(),
            earned_token_address: addr("0x5d412f4e13e5f612c86ab935c9f152e552695aad"),
            earn_contract_address: addr("0x5d412f4e13e5f612c86ab935c9f152e552695aad"),
            default_apy: "42.63".to_string(),
            price_per_full_share: 1.0,
            past_price_per_full_share: 1.0,
            chain_id: 56,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_pool(id: &str) -> PoolDescriptor {
        PoolDescriptor {
            id: id.to_string(),
            name: id.to_uppercase(),
            token: id.to_uppercase(),
            token_address: Some(Address::repeat_byte(0x11)),
            token_decimals: 18,
            itoken_decimals: 18,
            deposit_limit: U256::ZERO,
            earned_token: format!("i{}", id.to_uppercase()),
            earned_token_address: Address::repeat_byte(0x22),
            earn_contract_address: Address::repeat_byte(0x33),
            default_apy: String::new(),
            price_per_full_share: 1.0,
            past_price_per_full_share: 1.0,
            chain_id: 56,
        }
    }

    #[test]
    fn registry_accepts_valid_pools() {
        let registry = PoolRegistry::new(vec![test_pool("usdt"), test_pool("busd")]).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("usdt").unwrap().token, "USDT");
        assert!(registry.get("unknown").is_none());
    }

    #[test]
    fn registry_rejects_duplicate_ids() {
        let err = PoolRegistry::new(vec![test_pool("usdt"), test_pool("usdt")]).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicatePoolId(id) if id == "usdt"));
    }

    #[test]
    fn registry_rejects_zero_vault_address() {
        let mut pool = test_pool("usdt");
        pool.earn_contract_address = Address::ZERO;
        let err = PoolRegistry::new(vec![pool]).unwrap_err();
        assert!(matches!(err, RegistryError::MissingVaultAddress(_)));
    }

    #[test]
    fn empty_token_address_means_native_deposit() {
        let raw = r#"
            [[pools]]
            id = "usdc"
            name = "USDC"
            token = "USDC"
            token_address = ""
            token_decimals = 18
            itoken_decimals = 18
            earned_token = "iUSDC"
            earned_token_address = "0xaeb98fd0ba5acdc9471ee868a6fdd85ba1f20c6a"
            earn_contract_address = "0xaeb98fd0ba5acdc9471ee868a6fdd85ba1f20c6a"
            chain_id = 56
        "#;
        let registry = PoolRegistry::from_toml_str(raw).unwrap();
        let pool = registry.get("usdc").unwrap();
        assert!(pool.is_native_deposit());
        assert_eq!(pool.deposit_cap(), None);
        assert_eq!(pool.price_per_full_share, 1.0);
    }

    #[test]
    fn deposit_cap_is_some_when_limited() {
        let mut pool = test_pool("usdt");
        pool.deposit_limit = U256::from(500u64);
        assert_eq!(pool.deposit_cap(), Some(U256::from(500u64)));
    }

    #[test]
    fn default_pools_validate() {
        let registry = PoolRegistry::new(default_pools()).unwrap();
        assert_eq!(registry.len(), 3);
        assert!(registry.get("usdc").unwrap().is_native_deposit());
        assert!(!registry.get("usdt").unwrap().is_native_deposit());
    }
}
