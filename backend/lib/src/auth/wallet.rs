//! Wallet keys and EIP-191 personal-message signatures
//!
//! Every signature handled by the guard is a 65 bytes recoverable secp256k1
//! signature (`r || s || v`) over the EIP-191 hash of the signed bytes.

use std::fmt;

use alloy_core::primitives::{eip191_hash_message, Address};
use alloy_signer::{
    k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey},
    utils::public_key_to_address,
};

use super::AuthError;

/// Length in bytes of a recoverable signature
pub const SIGNATURE_LENGTH: usize = 65;

/// Offset added to the recovery id by Ethereum wallets
const LEGACY_V_OFFSET: u8 = 27;

/// A secp256k1 key pair identified by its Ethereum address
#[derive(Clone)]
pub struct Wallet {
    signing_key: SigningKey,
    address: Address,
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl Wallet {
    /// Generate a new random wallet
    pub fn random() -> Self {
        Self::from_signing_key(SigningKey::random(&mut rand::thread_rng()))
    }

    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        let address = public_key_to_address(signing_key.verifying_key());
        Self {
            signing_key,
            address,
        }
    }

    /// Load a wallet from a hex encoded private key, with or without `0x` prefix
    pub fn from_hex(secret: &str) -> Result<Self, AuthError> {
        let bytes = hex::decode(strip_hex_prefix(secret.trim()))
            .map_err(|_| AuthError::Signing("private key is not valid hex".to_string()))?;

        SigningKey::from_slice(&bytes)
            .map(Self::from_signing_key)
            .map_err(|_| AuthError::Signing("private key is not a valid secp256k1 scalar".to_string()))
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// `0x` prefixed hex encoding of the private key
    pub fn secret_hex(&self) -> String {
        format!("0x{}", hex::encode(self.signing_key.to_bytes()))
    }

    /// Sign `message` following EIP-191 `personal_sign`
    ///
    /// The recovery byte uses the `27/28` convention of Ethereum wallets.
    pub fn sign(&self, message: &[u8]) -> Result<[u8; SIGNATURE_LENGTH], AuthError> {
        let message_hash = eip191_hash_message(message);
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(message_hash.as_slice())
            .map_err(|e| AuthError::Signing(e.to_string()))?;

        let mut bytes = [0u8; SIGNATURE_LENGTH];
        bytes[..64].copy_from_slice(&signature.to_bytes());
        bytes[64] = recovery_id.to_byte() + LEGACY_V_OFFSET;

        Ok(bytes)
    }

    /// Same as [`Wallet::sign`], hex encoded with a `0x` prefix
    pub fn sign_hex(&self, message: &[u8]) -> Result<String, AuthError> {
        self.sign(message)
            .map(|signature| format!("0x{}", hex::encode(signature)))
    }
}

/// Recover the address that produced `signature` over `message`
///
/// Accepts both the raw (`0/1`) and the legacy (`27/28`) recovery byte.
pub fn recover_address(message: &[u8], signature: &[u8]) -> Result<Address, SignatureError> {
    if signature.len() != SIGNATURE_LENGTH {
        return Err(SignatureError::Length(signature.len()));
    }

    let v = match signature[64] {
        v @ (0 | 1) => v,
        v @ (27 | 28) => v - LEGACY_V_OFFSET,
        v => return Err(SignatureError::RecoveryId(v)),
    };
    let recovery_id = RecoveryId::from_byte(v).ok_or(SignatureError::RecoveryId(v))?;
    let signature =
        Signature::from_slice(&signature[..64]).map_err(|_| SignatureError::Malformed)?;

    let message_hash = eip191_hash_message(message);
    let verifying_key =
        VerifyingKey::recover_from_prehash(message_hash.as_slice(), &signature, recovery_id)
            .map_err(|_| SignatureError::Unrecoverable)?;

    Ok(public_key_to_address(&verifying_key))
}

/// Decode a hex signature as produced by wallets (`0x` prefix optional)
pub fn decode_hex_signature(signature: &str) -> Result<Vec<u8>, SignatureError> {
    let bytes =
        hex::decode(strip_hex_prefix(signature.trim())).map_err(|_| SignatureError::Encoding)?;

    if bytes.len() != SIGNATURE_LENGTH {
        return Err(SignatureError::Length(bytes.len()));
    }

    Ok(bytes)
}

fn strip_hex_prefix(value: &str) -> &str {
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value)
}

/// Failure to turn signature bytes into a signer address
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("signature is not valid hex")]
    Encoding,

    #[error("signature must be {SIGNATURE_LENGTH} bytes, got {0}")]
    Length(usize),

    #[error("invalid recovery id {0}")]
    RecoveryId(u8),

    #[error("malformed signature")]
    Malformed,

    #[error("signature does not recover to any public key")]
    Unrecoverable,
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known development key (first Hardhat/Anvil account)
    const DEV_SECRET: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const DEV_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    #[test]
    fn loads_known_key() {
        let wallet = Wallet::from_hex(DEV_SECRET).unwrap();
        assert_eq!(wallet.address().to_checksum(None), DEV_ADDRESS);
        assert_eq!(wallet.secret_hex(), DEV_SECRET);

        let unprefixed = Wallet::from_hex(&DEV_SECRET[2..]).unwrap();
        assert_eq!(unprefixed.address(), wallet.address());
    }

    #[test]
    fn rejects_bad_keys() {
        assert!(Wallet::from_hex("zz").is_err());
        assert!(Wallet::from_hex("0x00").is_err());
        // zero is not a valid scalar
        assert!(Wallet::from_hex(&format!("0x{}", "00".repeat(32))).is_err());
    }

    #[test]
    fn sign_then_recover() {
        let wallet = Wallet::random();
        let signature = wallet.sign(b"hello guard").unwrap();

        assert!(signature[64] == 27 || signature[64] == 28);
        assert_eq!(
            recover_address(b"hello guard", &signature).unwrap(),
            wallet.address()
        );
    }

    #[test]
    fn recovers_raw_recovery_id() {
        let wallet = Wallet::random();
        let mut signature = wallet.sign(b"raw v").unwrap();
        signature[64] -= LEGACY_V_OFFSET;

        assert_eq!(
            recover_address(b"raw v", &signature).unwrap(),
            wallet.address()
        );
    }

    #[test]
    fn other_message_recovers_other_address() {
        let wallet = Wallet::random();
        let signature = wallet.sign(b"original").unwrap();

        // recovery over different bytes yields some unrelated key, or fails outright
        match recover_address(b"tampered", &signature) {
            Ok(address) => assert_ne!(address, wallet.address()),
            Err(e) => assert_eq!(e, SignatureError::Unrecoverable),
        }
    }

    #[test]
    fn rejects_malformed_signatures() {
        assert_eq!(
            recover_address(b"msg", &[0u8; 64]),
            Err(SignatureError::Length(64))
        );

        let mut bad_v = [1u8; SIGNATURE_LENGTH];
        bad_v[64] = 5;
        assert_eq!(
            recover_address(b"msg", &bad_v),
            Err(SignatureError::RecoveryId(5))
        );

        assert_eq!(
            decode_hex_signature("not a signature"),
            Err(SignatureError::Encoding)
        );
        assert_eq!(decode_hex_signature("0xabcd"), Err(SignatureError::Length(2)));
    }

    #[test]
    fn hex_signature_roundtrip() {
        let wallet = Wallet::random();
        let hex_signature = wallet.sign_hex(b"payload").unwrap();

        let decoded = decode_hex_signature(&hex_signature).unwrap();
        assert_eq!(
            recover_address(b"payload", &decoded).unwrap(),
            wallet.address()
        );

        let decoded = decode_hex_signature(&hex_signature[2..]).unwrap();
        assert_eq!(
            recover_address(b"payload", &decoded).unwrap(),
            wallet.address()
        );
    }
}
