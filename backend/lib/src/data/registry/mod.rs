//! On-chain authorization registry
//!
//! The guard only ever asks one question of the registry: is this address
//! currently allowed to use the service?

use alloy_core::primitives::Address;
use async_trait::async_trait;

pub mod contract;
#[cfg(feature = "mocks")]
pub mod mock;

pub use contract::{ContractRegistry, ContractRegistryBuilder};
#[cfg(feature = "mocks")]
pub use mock::MockRegistry;

/// Error type for registry lookups
///
/// Any of these means the answer is unknown, never that the address is denied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Network or transport-related errors
    #[error("Transport error: {0}")]
    Transport(String),

    /// JSON-RPC errors returned by the node (e.g. reverted call)
    #[error("RPC error: {0}")]
    Rpc(String),

    /// The node answered something that is not an ABI encoded bool,
    /// usually a wrong contract address
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Request timeout errors
    #[error("Request timeout")]
    Timeout,
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Source of truth for whether an address may use the service
#[async_trait]
pub trait AuthorizationRegistry: Send + Sync {
    /// `Ok(false)` is a denial, `Err(_)` means the registry could not be consulted
    async fn is_authorized(&self, address: &Address) -> RegistryResult<bool>;
}
