use std::str::FromStr;

use alloy_core::primitives::Address;

use super::AuthError;

/// Parses a wallet address, accepting any letter case.
///
/// The address must be:
///
/// * prefixed with `0x`
/// * 42 characters long (0x + 20 bytes)
/// * made only of ascii hex digits after the prefix
///
/// The checksum of mixed-case input is not enforced; callers render the
/// canonical form with [`checksummed`].
pub fn parse_address(address: &str) -> Result<Address, AuthError> {
    if !is_address(address) {
        return Err(AuthError::InvalidSubject(format!(
            "'{address}' is not a valid Ethereum address"
        )));
    }

    Address::from_str(address).map_err(|e| AuthError::InvalidSubject(e.to_string()))
}

/// Returns whether `address` has the shape of a wallet address
pub fn is_address(address: &str) -> bool {
    address.len() == 42
        && address.starts_with("0x")
        && address[2..].chars().all(|c| c.is_ascii_hexdigit())
}

/// EIP-55 checksummed rendering of `address`
pub fn checksummed(address: &Address) -> String {
    address.to_checksum(None)
}
