use std::fmt;

#[derive(Debug)]
pub enum ContractError {
    // Initialization errors
    AbiParseError(String),
    NotInitialized(&'static str),

    // Contract interaction errors
    CallError(String),
    TransactionError(String),

    // Data parsing errors
    DecodingError(String),
    InvalidResponse(String),

    // Domain errors
    MissingDepositToken(String),

    // Generic errors
    Other(String),
}

impl std::error::Error for ContractError {}

impl fmt::Display for ContractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractError::AbiParseError(msg) => write!(f, "Failed to parse ABI: {msg}"),
            ContractError::NotInitialized(name) => {
                write!(f, "Contract not initialized: {name}")
            }
            ContractError::CallError(msg) => write!(f, "Contract call failed: {msg}"),
            ContractError::TransactionError(msg) => write!(f, "Transaction failed: {msg}"),
            ContractError::DecodingError(msg) => write!(f, "Failed to decode data: {msg}"),
            ContractError::InvalidResponse(msg) => {
                write!(f, "Invalid contract response: {msg}")
            }
            ContractError::MissingDepositToken(pool) => {
                write!(f, "Pool {pool} deposits the native asset and has no token contract")
            }
            ContractError::Other(msg) => write!(f, "Web3 error: {msg}"),
        }
    }
}

// Convenient type alias for Result with ContractError
pub type ContractResult<T> = Result<T, ContractError>;

impl From<serde_json::Error> for ContractError {
    fn from(err: serde_json::Error) -> Self {
        ContractError::AbiParseError(err.to_string())
    }
}

impl From<alloy::contract::Error> for ContractError {
    fn from(err: alloy::contract::Error) -> Self {
        ContractError::CallError(err.to_string())
    }
}

impl From<alloy::providers::PendingTransactionError> for ContractError {
    fn from(err: alloy::providers::PendingTransactionError) -> Self {
        ContractError::TransactionError(err.to_string())
    }
}
