//! Mock registry implementation for testing
//!
//! Keeps the set of authorized addresses in memory and can simulate the
//! registry being unreachable.

use std::collections::HashSet;

use alloy_core::primitives::Address;
use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{AuthorizationRegistry, RegistryError, RegistryResult};

/// Error simulation modes for testing
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// No errors - lookups answer from the in-memory set
    #[default]
    None,
    /// Simulate the node not answering in time
    Timeout,
    /// Simulate transport error
    TransportError(String),
    /// Simulate a reverted call
    RpcError(String),
}

/// In-memory registry
#[derive(Default)]
pub struct MockRegistry {
    authorized: RwLock<HashSet<Address>>,
    error_mode: RwLock<ErrorMode>,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry that already authorizes the given addresses
    pub fn with_authorized(addresses: impl IntoIterator<Item = Address>) -> Self {
        Self {
            authorized: RwLock::new(addresses.into_iter().collect()),
            error_mode: RwLock::default(),
        }
    }

    pub async fn authorize(&self, address: Address) {
        self.authorized.write().await.insert(address);
    }

    pub async fn revoke(&self, address: &Address) {
        self.authorized.write().await.remove(address);
    }

    /// Set the error simulation mode
    pub async fn set_error_mode(&self, mode: ErrorMode) {
        *self.error_mode.write().await = mode;
    }

    /// Shorthand for toggling a transport failure
    pub async fn set_unreachable(&self, unreachable: bool) {
        let mode = if unreachable {
            ErrorMode::TransportError("connection refused".to_string())
        } else {
            ErrorMode::None
        };
        self.set_error_mode(mode).await;
    }
}

#[async_trait]
impl AuthorizationRegistry for MockRegistry {
    async fn is_authorized(&self, address: &Address) -> RegistryResult<bool> {
        match self.error_mode.read().await.clone() {
            ErrorMode::None => {}
            ErrorMode::Timeout => return Err(RegistryError::Timeout),
            ErrorMode::TransportError(msg) => return Err(RegistryError::Transport(msg)),
            ErrorMode::RpcError(msg) => return Err(RegistryError::Rpc(msg)),
        }

        Ok(self.authorized.read().await.contains(address))
    }
}
