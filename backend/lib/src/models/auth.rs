use alloy_core::primitives::Address;
use serde::{Deserialize, Serialize};

/// Body of a challenge request
///
/// The address is kept as a string so a malformed one is answered like any
/// other protocol failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChallengeRequest {
    pub address: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChallengeResponse {
    pub message: String,
}

/// A challenge together with the wallet signature over it
#[derive(Debug, Serialize, Deserialize)]
pub struct SignedMessage {
    pub message: String,
    pub signature: String,
}

/// Outcome of a successful login or token verification
///
/// `token` is only present right after login.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AuthenticationResult {
    #[serde(serialize_with = "crate::utils::serde::checksummed_address")]
    pub address: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ProtectedResponse {
    #[serde(serialize_with = "crate::utils::serde::checksummed_address")]
    pub address: Address,
    pub message: String,
}
