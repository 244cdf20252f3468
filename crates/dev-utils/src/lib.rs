use std::path::Path;

use alloy::primitives::U256;
use eyre::{bail, eyre, Result};
use shared::models::pool::{default_pools, PoolRegistry};

/// Loads the pool registry from a TOML file, or the built-in set when no
/// path is given.
pub fn load_registry(path: Option<&Path>) -> Result<PoolRegistry> {
    let registry = match path {
        Some(path) => PoolRegistry::load(path)?,
        None => PoolRegistry::new(default_pools())?,
    };
    Ok(registry)
}

/// Converts a human token amount such as "1.5" into chain-native units.
pub fn parse_units(amount: &str, decimals: u8) -> Result<U256> {
    let amount = amount.trim();
    let (whole, frac) = match amount.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (amount, ""),
    };

    if whole.is_empty() && frac.is_empty() {
        bail!("invalid amount: {amount:?}");
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        bail!("invalid amount: {amount:?}");
    }
    if frac.len() > decimals as usize {
        bail!("amount {amount} has more than {decimals} decimal places");
    }

    let scale = U256::from(10u64)
        .checked_pow(U256::from(decimals))
        .ok_or_else(|| eyre!("decimals out of range: {decimals}"))?;
    let whole_units = if whole.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(whole, 10)?
            .checked_mul(scale)
            .ok_or_else(|| eyre!("amount overflows: {amount}"))?
    };

    let frac_units = if frac.is_empty() {
        U256::ZERO
    } else {
        let frac_scale = U256::from(10u64)
            .checked_pow(U256::from((decimals as usize - frac.len()) as u64))
            .ok_or_else(|| eyre!("decimals out of range: {decimals}"))?;
        U256::from_str_radix(frac, 10)? * frac_scale
    };

    whole_units
        .checked_add(frac_units)
        .ok_or_else(|| eyre!("amount overflows: {amount}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_amounts_scale_by_decimals() {
        assert_eq!(
            parse_units("1", 18).unwrap(),
            U256::from(10u64).pow(U256::from(18u64))
        );
        assert_eq!(parse_units("0", 6).unwrap(), U256::ZERO);
    }

    #[test]
    fn fractional_amounts_are_exact() {
        assert_eq!(
            parse_units("1.5", 18).unwrap(),
            U256::from(1_500_000_000_000_000_000u128)
        );
        assert_eq!(parse_units("0.000001", 6).unwrap(), U256::from(1u64));
        assert_eq!(parse_units(".5", 1).unwrap(), U256::from(5u64));
    }

    #[test]
    fn excess_precision_is_rejected() {
        assert!(parse_units("1.234", 2).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_units("", 18).is_err());
        assert!(parse_units(".", 18).is_err());
        assert!(parse_units("1.2.3", 18).is_err());
        assert!(parse_units("abc", 18).is_err());
        assert!(parse_units("-1", 18).is_err());
    }

    #[test]
    fn built_in_registry_loads() {
        let registry = load_registry(None).unwrap();
        assert!(!registry.is_empty());
    }
}
