use alloy::{
    contract::{ContractInstance, Interface},
    json_abi::JsonAbi,
    primitives::Address,
};

use std::include_bytes;

macro_rules! include_abi {
    ($path:expr) => {{
        const ABI_BYTES: &[u8] = include_bytes!($path);
        ABI_BYTES
    }};
}

/// A contract instance bound to a bundled ABI artifact.
#[derive(Clone)]
pub struct Contract<P: alloy_provider::Provider> {
    instance: ContractInstance<P>,
}

impl<P: alloy_provider::Provider> Contract<P> {
    pub fn new(address: Address, provider: P, abi_file_path: &str) -> Self {
        let instance = Self::parse_abi(abi_file_path, provider, address);
        Self { instance }
    }

    fn parse_abi(path: &str, provider: P, address: Address) -> ContractInstance<P> {
        let artifact = match path {
            "erc20.json" => include_abi!("../../../../artifacts/abi/erc20.json"),
            "vault.json" => include_abi!("../../../../artifacts/abi/vault.json"),
            _ => panic!("Unknown ABI file: {path}"),
        };

        // Artifacts are compiled into the binary, so a parse failure is a
        // packaging defect rather than a runtime condition.
        let abi: JsonAbi = serde_json::from_slice(artifact)
            .unwrap_or_else(|err| panic!("Invalid bundled ABI {path}: {err}"));

        ContractInstance::new(address, provider, Interface::new(abi))
    }

    pub fn instance(&self) -> &ContractInstance<P> {
        &self.instance
    }

    pub fn provider(&self) -> &P {
        self.instance.provider()
    }

    pub fn address(&self) -> Address {
        *self.instance.address()
    }
}
