//! Test utilities for authentication
//!
//! This module provides common utilities for testing authentication functionality

use crate::auth::Wallet;

/// Generate a random ETH wallet
pub fn eth_wallet() -> Wallet {
    Wallet::random()
}

/// Sign a message using EIP-191 personal_sign format
///
/// Returns the `0x` prefixed hex signature, with `v` as 27/28
pub fn sign_message(wallet: &Wallet, message: &str) -> String {
    wallet
        .sign_hex(message.as_bytes())
        .expect("signing with an in-memory key succeeds")
}
