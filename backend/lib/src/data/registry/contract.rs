//! Registry contract client
//!
//! Reads `isValidUser(address)` with a plain `eth_call` over HTTP JSON-RPC,
//! using jsonrpsee for transport.

use std::time::Duration;

use alloy_core::primitives::{keccak256, Address};
use async_trait::async_trait;
use jsonrpsee::{
    core::client::{ClientT, Error as ClientError},
    http_client::{HttpClient, HttpClientBuilder},
    rpc_params,
};
use serde::Serialize;
use tracing::debug;

use super::{AuthorizationRegistry, RegistryError, RegistryResult};
use crate::constants::registry::{DEFAULT_TIMEOUT_SECS, IS_VALID_USER_SIGNATURE};

const ETH_CALL: &str = "eth_call";
const LATEST_BLOCK: &str = "latest";

/// Size of one ABI word
const WORD_SIZE: usize = 32;

#[derive(Debug, Serialize)]
struct CallRequest {
    to: Address,
    data: String,
}

/// Registry backed by the deployed registry contract
pub struct ContractRegistry {
    client: HttpClient,
    contract: Address,
}

impl ContractRegistry {
    pub fn new(rpc_url: &str, contract: Address, timeout: Duration) -> RegistryResult<Self> {
        let client = HttpClientBuilder::default()
            .request_timeout(timeout)
            .build(rpc_url)
            .map_err(|e| {
                RegistryError::Transport(format!("Failed to create client for {rpc_url}: {e}"))
            })?;

        Ok(Self { client, contract })
    }

    pub fn contract(&self) -> Address {
        self.contract
    }
}

#[async_trait]
impl AuthorizationRegistry for ContractRegistry {
    async fn is_authorized(&self, address: &Address) -> RegistryResult<bool> {
        debug!(target: "registry::contract::is_authorized", address = %address, "RPC call: isValidUser");

        let request = CallRequest {
            to: self.contract,
            data: format!("0x{}", hex::encode(is_valid_user_calldata(address))),
        };

        let response: String = self
            .client
            .request(ETH_CALL, rpc_params![request, LATEST_BLOCK])
            .await
            .map_err(into_registry_error)?;

        decode_bool(&response)
    }
}

/// ABI encoded call of `isValidUser(address)`
pub fn is_valid_user_calldata(address: &Address) -> Vec<u8> {
    let selector = &keccak256(IS_VALID_USER_SIGNATURE.as_bytes())[..4];

    let mut calldata = Vec::with_capacity(4 + WORD_SIZE);
    calldata.extend_from_slice(selector);
    // addresses are left padded to a full word
    calldata.extend_from_slice(&[0u8; WORD_SIZE - 20]);
    calldata.extend_from_slice(address.as_slice());
    calldata
}

/// Decode an ABI encoded `bool` return value
pub fn decode_bool(response: &str) -> RegistryResult<bool> {
    let hex_data = response.strip_prefix("0x").unwrap_or(response);
    let word = hex::decode(hex_data)
        .map_err(|_| RegistryError::InvalidResponse("result is not hex".to_string()))?;

    // an empty result is what a node returns when there is no contract at the address
    if word.len() != WORD_SIZE {
        return Err(RegistryError::InvalidResponse(format!(
            "expected {WORD_SIZE} bytes, got {}",
            word.len()
        )));
    }

    match (word[..WORD_SIZE - 1].iter().all(|b| *b == 0), word[WORD_SIZE - 1]) {
        (true, 0) => Ok(false),
        (true, 1) => Ok(true),
        _ => Err(RegistryError::InvalidResponse(
            "result is not a boolean".to_string(),
        )),
    }
}

fn into_registry_error(error: ClientError) -> RegistryError {
    match error {
        ClientError::Call(e) => RegistryError::Rpc(e.to_string()),
        ClientError::Transport(e) => RegistryError::Transport(e.to_string()),
        ClientError::RequestTimeout => RegistryError::Timeout,
        ClientError::ParseError(e) => RegistryError::InvalidResponse(e.to_string()),
        other => RegistryError::Transport(other.to_string()),
    }
}

/// Builder for [`ContractRegistry`]
pub struct ContractRegistryBuilder {
    rpc_url: String,
    contract: Address,
    timeout_secs: u64,
}

impl ContractRegistryBuilder {
    pub fn new(rpc_url: impl Into<String>, contract: Address) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            contract,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Set the request timeout
    pub fn timeout_secs(mut self, timeout: u64) -> Self {
        self.timeout_secs = timeout;
        self
    }

    pub fn build(self) -> RegistryResult<ContractRegistry> {
        ContractRegistry::new(
            &self.rpc_url,
            self.contract,
            Duration::from_secs(self.timeout_secs),
        )
    }
}
