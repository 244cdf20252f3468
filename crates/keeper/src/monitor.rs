use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::U256;
use alloy::providers::Provider;

use shared::models::pool::{PoolDescriptor, PoolRegistry};
use shared::web3::contracts::core::builder::PoolContracts;
use shared::web3::contracts::core::error::ContractError;
use shared::web3::wallet::{Wallet, WalletProvider};

use crate::poller::PollingReader;
use crate::store::PortfolioStore;

/// What happens to mirrored values when a read call fails. The polling loop
/// itself always survives the failure; this only governs the stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadFailurePolicy {
    /// Keep the last good value.
    RetainLastValue,
    /// Zero the affected values until a read succeeds again.
    ResetValue,
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub balance_interval: Duration,
    pub earnings_interval: Duration,
    pub share_price_interval: Duration,
    pub failure_policy: ReadFailurePolicy,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            balance_interval: Duration::from_secs(10),
            earnings_interval: Duration::from_secs(15),
            share_price_interval: Duration::from_secs(120),
            failure_policy: ReadFailurePolicy::RetainLastValue,
        }
    }
}

/// Keeps the portfolio store current: one polling reader per concern per
/// pool, all bound to this monitor's start/stop lifetime.
pub struct PortfolioMonitor {
    registry: Arc<PoolRegistry>,
    store: Arc<PortfolioStore>,
    wallet: Arc<Wallet>,
    config: MonitorConfig,
    readers: Mutex<Vec<PollingReader>>,
}

impl PortfolioMonitor {
    pub fn new(
        registry: Arc<PoolRegistry>,
        store: Arc<PortfolioStore>,
        wallet: Arc<Wallet>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            registry,
            store,
            wallet,
            config,
            readers: Mutex::new(Vec::new()),
        }
    }

    pub fn start(&self) -> Result<(), ContractError> {
        let mut readers = self.readers.lock().unwrap();
        if !readers.is_empty() {
            log::debug!("Portfolio monitor already running, skipping start");
            return Ok(());
        }

        for pool in self.registry.iter() {
            let contracts = Arc::new(PoolContracts::for_pool(pool, self.wallet.provider.clone())?);

            readers.push(self.spawn_balance_reader(pool, contracts.clone()));
            if !pool.is_native_deposit() {
                readers.push(self.spawn_allowance_reader(pool, contracts.clone()));
            }
            readers.push(self.spawn_position_reader(pool, contracts.clone()));
            readers.push(self.spawn_share_price_reader(pool, contracts));
        }

        log::info!(
            "Portfolio monitor started with {} readers over {} pools",
            readers.len(),
            self.registry.len()
        );
        Ok(())
    }

    pub fn stop(&self) {
        let mut readers = self.readers.lock().unwrap();
        for reader in readers.drain(..) {
            reader.stop();
        }
        log::info!("Portfolio monitor stopped");
    }

    /// Mirrors the wallet's deposit-asset balance: the native balance for
    /// native pools, the ERC-20 balance otherwise.
    fn spawn_balance_reader(
        &self,
        pool: &PoolDescriptor,
        contracts: Arc<PoolContracts<WalletProvider>>,
    ) -> PollingReader {
        let reader = PollingReader::new(
            format!("balance:{}", pool.id),
            self.config.balance_interval,
        );

        let owner = self.wallet.address();
        let provider = self.wallet.provider.clone();
        let pool_id = pool.id.clone();
        let native = pool.is_native_deposit();

        let fetch = move || {
            let contracts = contracts.clone();
            let provider = provider.clone();
            let pool_id = pool_id.clone();
            async move {
                if native {
                    provider
                        .get_balance(owner)
                        .await
                        .map_err(|e| ContractError::Other(e.to_string()))
                } else {
                    contracts
                        .require_deposit_token(&pool_id)?
                        .balance_of(owner)
                        .await
                }
            }
        };

        let store = self.store.clone();
        let policy = self.config.failure_policy;
        let chain_id = pool.chain_id;
        let symbol = pool.token.clone();
        let apply = move |result: Result<U256, ContractError>| match result {
            Ok(balance) => store.set_token_balance(chain_id, &symbol, balance),
            Err(_) => {
                if policy == ReadFailurePolicy::ResetValue {
                    store.set_token_balance(chain_id, &symbol, U256::ZERO);
                }
            }
        };

        reader.start(fetch, apply);
        reader
    }

    /// Mirrors the allowance granted to the vault over the deposit token.
    fn spawn_allowance_reader(
        &self,
        pool: &PoolDescriptor,
        contracts: Arc<PoolContracts<WalletProvider>>,
    ) -> PollingReader {
        let reader = PollingReader::new(
            format!("allowance:{}", pool.id),
            self.config.balance_interval,
        );

        let owner = self.wallet.address();
        let pool_id = pool.id.clone();
        let fetch = move || {
            let contracts = contracts.clone();
            let pool_id = pool_id.clone();
            async move {
                let vault = contracts.vault.address();
                contracts
                    .require_deposit_token(&pool_id)?
                    .allowance(owner, vault)
                    .await
            }
        };

        let store = self.store.clone();
        let policy = self.config.failure_policy;
        let pool_id = pool.id.clone();
        let apply = move |result: Result<U256, ContractError>| match result {
            Ok(allowance) => store.set_allowance(&pool_id, allowance),
            Err(_) => {
                if policy == ReadFailurePolicy::ResetValue {
                    store.set_allowance(&pool_id, U256::ZERO);
                }
            }
        };

        reader.start(fetch, apply);
        reader
    }

    /// Mirrors the staked shares and accrued rewards in one tick.
    fn spawn_position_reader(
        &self,
        pool: &PoolDescriptor,
        contracts: Arc<PoolContracts<WalletProvider>>,
    ) -> PollingReader {
        let reader = PollingReader::new(
            format!("position:{}", pool.id),
            self.config.earnings_interval,
        );

        let owner = self.wallet.address();
        let fetch = move || {
            let contracts = contracts.clone();
            async move {
                let staked = contracts.vault.staked_balance_of(owner).await?;
                let earned = contracts.vault.earned(owner).await?;
                Ok::<_, ContractError>((staked, earned))
            }
        };

        let store = self.store.clone();
        let policy = self.config.failure_policy;
        let pool_id = pool.id.clone();
        let apply = move |result: Result<(U256, U256), ContractError>| match result {
            Ok((staked, earned)) => store.set_position(&pool_id, staked, earned),
            Err(_) => {
                if policy == ReadFailurePolicy::ResetValue {
                    store.set_position(&pool_id, U256::ZERO, U256::ZERO);
                }
            }
        };

        reader.start(fetch, apply);
        reader
    }

    /// Mirrors the share price and derives an annualized yield from its
    /// growth between consecutive samples.
    fn spawn_share_price_reader(
        &self,
        pool: &PoolDescriptor,
        contracts: Arc<PoolContracts<WalletProvider>>,
    ) -> PollingReader {
        let interval = self.config.share_price_interval;
        let reader = PollingReader::new(format!("share-price:{}", pool.id), interval);

        let fetch = move || {
            let contracts = contracts.clone();
            async move { contracts.vault.price_per_full_share().await }
        };

        let store = self.store.clone();
        let policy = self.config.failure_policy;
        let pool_id = pool.id.clone();
        let previous: Arc<Mutex<Option<U256>>> = Arc::new(Mutex::new(None));
        let apply = move |result: Result<U256, ContractError>| match result {
            Ok(price) => {
                let mut previous = previous.lock().unwrap();
                if let Some(last) = *previous {
                    if let Some(apy) = derive_apy(price, last, interval) {
                        store.set_apy(&pool_id, apy);
                    }
                }
                *previous = Some(price);
                store.set_share_price(&pool_id, price);
            }
            Err(_) => {
                if policy == ReadFailurePolicy::ResetValue {
                    store.update_pool(&pool_id, |snapshot| {
                        snapshot.share_price = U256::ZERO;
                        snapshot.apy = None;
                    });
                }
            }
        };

        reader.start(fetch, apply);
        reader
    }
}

/// Annualized percentage yield implied by share-price growth over one sample
/// interval, compounded daily-equivalent over a year. `None` when there is no
/// usable baseline.
pub fn derive_apy(current: U256, previous: U256, elapsed: Duration) -> Option<f64> {
    if previous.is_zero() || elapsed.is_zero() {
        return None;
    }
    let current = u256_to_f64(current);
    let previous = u256_to_f64(previous);
    if previous <= 0.0 {
        return None;
    }

    let growth = current / previous - 1.0;
    let periods_per_year = (365.0 * 86_400.0) / elapsed.as_secs_f64();
    Some(((1.0 + growth).powf(periods_per_year) - 1.0) * 100.0)
}

// Share prices fit comfortably in f64 range for display purposes; precision
// loss above 2^53 is acceptable here.
fn u256_to_f64(value: U256) -> f64 {
    value.to_string().parse().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::pool::default_pools;
    use tokio::time::sleep;
    use url::Url;

    const TEST_KEY: &str = "0xdbda1821b80551c9d65939329250298aa3472ba22feea921c0cf5d620ea67b97";

    fn monitor(policy: ReadFailurePolicy) -> (PortfolioMonitor, Arc<PortfolioStore>) {
        let registry = Arc::new(PoolRegistry::new(default_pools()).unwrap());
        let store = Arc::new(PortfolioStore::new(&registry));
        // Unreachable RPC endpoint: every read call fails.
        let wallet = Arc::new(
            Wallet::new(TEST_KEY, Url::parse("http://127.0.0.1:9").unwrap()).unwrap(),
        );
        let config = MonitorConfig {
            balance_interval: Duration::from_millis(20),
            earnings_interval: Duration::from_millis(20),
            share_price_interval: Duration::from_millis(20),
            failure_policy: policy,
        };
        (
            PortfolioMonitor::new(registry, store.clone(), wallet, config),
            store,
        )
    }

    #[tokio::test]
    async fn retain_policy_keeps_last_value_on_read_failure() {
        let (monitor, store) = monitor(ReadFailurePolicy::RetainLastValue);
        store.set_position("usdt", U256::from(10u64), U256::from(2u64));

        monitor.start().unwrap();
        sleep(Duration::from_millis(150)).await;
        monitor.stop();

        let snapshot = store.pool("usdt").unwrap();
        assert_eq!(snapshot.staked, U256::from(10u64));
        assert_eq!(snapshot.earned, U256::from(2u64));
    }

    #[tokio::test]
    async fn reset_policy_zeroes_values_on_read_failure() {
        let (monitor, store) = monitor(ReadFailurePolicy::ResetValue);
        store.set_position("usdt", U256::from(10u64), U256::from(2u64));

        monitor.start().unwrap();
        sleep(Duration::from_millis(150)).await;
        monitor.stop();

        let snapshot = store.pool("usdt").unwrap();
        assert_eq!(snapshot.staked, U256::ZERO);
        assert_eq!(snapshot.earned, U256::ZERO);
    }

    #[test]
    fn derive_apy_needs_a_baseline() {
        assert_eq!(
            derive_apy(U256::from(100u64), U256::ZERO, Duration::from_secs(60)),
            None
        );
        assert_eq!(
            derive_apy(U256::from(100u64), U256::from(100u64), Duration::ZERO),
            None
        );
    }

    #[test]
    fn flat_share_price_means_zero_apy() {
        let apy = derive_apy(
            U256::from(1_000_000u64),
            U256::from(1_000_000u64),
            Duration::from_secs(3600),
        )
        .unwrap();
        assert!(apy.abs() < 1e-9);
    }

    #[test]
    fn daily_tenth_percent_growth_compounds_to_expected_apy() {
        // 0.1% growth per day compounds to about 44% a year.
        let apy = derive_apy(
            U256::from(1_001_000u64),
            U256::from(1_000_000u64),
            Duration::from_secs(86_400),
        )
        .unwrap();
        assert!((apy - 44.0).abs() < 1.0, "apy was {apy}");
    }
}
