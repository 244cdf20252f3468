pub mod pool;

pub use pool::{default_pools, PoolDescriptor, PoolRegistry};
