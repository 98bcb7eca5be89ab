//! Wallet authentication protocol
//!
//! Challenge/response sign-in and self-signed bearer tokens. Everything in
//! here is synchronous and stateless: validity is carried by the signed data
//! itself and checked against the clock when it is presented.

pub mod address;
pub mod challenge;
pub mod token;
pub mod wallet;

pub use address::parse_address;
pub use challenge::{ChallengeBuilder, ChallengeMessage, ChallengeVerifier};
pub use token::{
    DecodedToken, TokenClaims, TokenHeader, TokenIssuer, TokenVerifier, VerifiedToken,
};
pub use wallet::Wallet;

/// Failures of the authentication protocol
///
/// Every variant is terminal for the request that produced it, retrying
/// the same input fails the same way.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("challenge error: {0}")]
    ChallengeInvalid(String),

    #[error("malformed token: {0}")]
    TokenMalformed(String),

    #[error("signer address does not match the token issuer")]
    IssuerMismatch,

    #[error("the token is not valid yet (nbf)")]
    TokenNotYetValid,

    #[error("the token has expired")]
    TokenExpired,

    #[error("the given domain does not match the token audience")]
    AudienceMismatch,

    #[error("invalid subject: {0}")]
    InvalidSubject(String),

    #[error("signing failed: {0}")]
    Signing(String),
}
