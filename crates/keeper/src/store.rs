use alloy::primitives::{Address, U256};
use dashmap::DashMap;
use shared::models::pool::PoolRegistry;

/// Latest known wallet balance of one token on one chain.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenBalanceEntry {
    pub token_address: Option<Address>,
    pub balance: U256,
}

/// Latest known per-pool values, refreshed by the polling readers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PoolSnapshot {
    /// Deposit-token allowance granted to the vault.
    pub allowance: U256,
    /// Receipt shares held in the vault.
    pub staked: U256,
    /// Accrued, unclaimed rewards.
    pub earned: U256,
    pub share_price: U256,
    /// Annualized yield derived from share-price growth, percent.
    pub apy: Option<f64>,
}

/// In-memory mirror of on-chain state. Writes overwrite unconditionally:
/// last write wins, there is no staleness tracking.
pub struct PortfolioStore {
    tokens: DashMap<(u64, String), TokenBalanceEntry>,
    pools: DashMap<String, PoolSnapshot>,
}

impl PortfolioStore {
    /// Seeds one zero-balance entry per (chain, symbol) for both the deposit
    /// and reward token of every pool, and a zeroed snapshot per pool.
    pub fn new(registry: &PoolRegistry) -> Self {
        let tokens = DashMap::new();
        let pools = DashMap::new();
        for pool in registry.iter() {
            tokens.insert(
                (pool.chain_id, pool.token.clone()),
                TokenBalanceEntry {
                    token_address: pool.token_address,
                    balance: U256::ZERO,
                },
            );
            tokens.insert(
                (pool.chain_id, pool.earned_token.clone()),
                TokenBalanceEntry {
                    token_address: Some(pool.earned_token_address),
                    balance: U256::ZERO,
                },
            );
            pools.insert(pool.id.clone(), PoolSnapshot::default());
        }
        Self { tokens, pools }
    }

    pub fn set_token_balance(&self, chain_id: u64, symbol: &str, balance: U256) {
        let mut entry = self
            .tokens
            .entry((chain_id, symbol.to_string()))
            .or_insert_with(|| TokenBalanceEntry {
                token_address: None,
                balance: U256::ZERO,
            });
        entry.balance = balance;
    }

    pub fn token_balance(&self, chain_id: u64, symbol: &str) -> Option<TokenBalanceEntry> {
        self.tokens
            .get(&(chain_id, symbol.to_string()))
            .map(|entry| entry.clone())
    }

    pub fn update_pool(&self, id: &str, update: impl FnOnce(&mut PoolSnapshot)) {
        let mut snapshot = self.pools.entry(id.to_string()).or_default();
        update(&mut snapshot);
    }

    pub fn set_allowance(&self, id: &str, allowance: U256) {
        self.update_pool(id, |snapshot| snapshot.allowance = allowance);
    }

    pub fn set_position(&self, id: &str, staked: U256, earned: U256) {
        self.update_pool(id, |snapshot| {
            snapshot.staked = staked;
            snapshot.earned = earned;
        });
    }

    pub fn set_share_price(&self, id: &str, share_price: U256) {
        self.update_pool(id, |snapshot| snapshot.share_price = share_price);
    }

    pub fn set_apy(&self, id: &str, apy: f64) {
        self.update_pool(id, |snapshot| snapshot.apy = Some(apy));
    }

    /// Zeroes a pool's snapshot. Used by the reset read-failure policy.
    pub fn reset_pool(&self, id: &str) {
        self.pools.insert(id.to_string(), PoolSnapshot::default());
    }

    pub fn pool(&self, id: &str) -> Option<PoolSnapshot> {
        self.pools.get(id).map(|snapshot| snapshot.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::pool::default_pools;

    fn store() -> PortfolioStore {
        let registry = PoolRegistry::new(default_pools()).unwrap();
        PortfolioStore::new(&registry)
    }

    #[test]
    fn seeds_every_pool_symbol_at_zero() {
        let store = store();

        // Native deposit asset: seeded with no token address.
        let usdc = store.token_balance(56, "USDC").unwrap();
        assert_eq!(usdc.token_address, None);
        assert_eq!(usdc.balance, U256::ZERO);

        // Reward tokens are seeded too.
        let iusdt = store.token_balance(56, "iUSDT").unwrap();
        assert!(iusdt.token_address.is_some());
        assert_eq!(iusdt.balance, U256::ZERO);

        assert_eq!(store.pool("busd").unwrap(), PoolSnapshot::default());
        assert!(store.token_balance(1, "USDC").is_none());
    }

    #[test]
    fn token_balance_writes_are_last_write_wins() {
        let store = store();
        store.set_token_balance(56, "USDT", U256::from(100u64));
        store.set_token_balance(56, "USDT", U256::from(7u64));
        assert_eq!(
            store.token_balance(56, "USDT").unwrap().balance,
            U256::from(7u64)
        );
    }

    #[test]
    fn pool_updates_touch_only_named_fields() {
        let store = store();
        store.set_allowance("usdt", U256::from(5u64));
        store.set_position("usdt", U256::from(10u64), U256::from(2u64));

        let snapshot = store.pool("usdt").unwrap();
        assert_eq!(snapshot.allowance, U256::from(5u64));
        assert_eq!(snapshot.staked, U256::from(10u64));
        assert_eq!(snapshot.earned, U256::from(2u64));
        assert_eq!(snapshot.share_price, U256::ZERO);
    }

    #[test]
    fn reset_pool_zeroes_the_snapshot() {
        let store = store();
        store.set_position("usdt", U256::from(10u64), U256::from(2u64));
        store.reset_pool("usdt");
        assert_eq!(store.pool("usdt").unwrap(), PoolSnapshot::default());
    }
}
