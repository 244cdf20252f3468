use alloy::{
    contract::CallBuilder, dyn_abi::DynSolValue, json_abi::Function, network::Ethereum,
    primitives::U256,
};

use crate::web3::contracts::core::error::{ContractError, ContractResult};

/// Call builder produced by the dynamic-ABI contract instances.
pub type DynCallBuilder<'a, P> = CallBuilder<&'a P, Function, Ethereum>;

/// Decodes a single-uint return value, rejecting empty or ill-typed responses.
pub fn decode_uint(values: &[DynSolValue], method: &str) -> ContractResult<U256> {
    values
        .first()
        .ok_or_else(|| ContractError::InvalidResponse(format!("{method}: empty return data")))?
        .as_uint()
        .map(|(value, _)| value)
        .ok_or_else(|| {
            ContractError::DecodingError(format!("{method}: return value is not a uint"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_uint_reads_first_value() {
        let values = vec![DynSolValue::Uint(U256::from(42u64), 256)];
        assert_eq!(decode_uint(&values, "balanceOf").unwrap(), U256::from(42u64));
    }

    #[test]
    fn decode_uint_rejects_empty_response() {
        let err = decode_uint(&[], "earned").unwrap_err();
        assert!(matches!(err, ContractError::InvalidResponse(_)));
    }

    #[test]
    fn decode_uint_rejects_wrong_type() {
        let values = vec![DynSolValue::Bool(true)];
        let err = decode_uint(&values, "allowance").unwrap_err();
        assert!(matches!(err, ContractError::DecodingError(_)));
    }
}
