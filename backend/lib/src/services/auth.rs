use std::sync::Arc;

use alloy_core::primitives::Address;
use chrono::{Duration, Utc};
use tracing::{debug, error, warn};

use crate::{
    auth::{
        AuthError, ChallengeBuilder, ChallengeVerifier, TokenIssuer, TokenVerifier,
    },
    config::Config,
    data::registry::AuthorizationRegistry,
    error::Error,
    models::auth::{AuthenticationResult, ChallengeResponse},
};

mod axum;
pub use axum::AuthenticatedUser;

/// Drives the wallet login handshake and checks bearer tokens
pub struct AuthService {
    challenges: ChallengeBuilder,
    verifier: ChallengeVerifier,
    issuer: TokenIssuer,
    /// Challenge domain and token audience
    domain: String,
    registry: Arc<dyn AuthorizationRegistry>,
}

impl AuthService {
    pub fn new(config: &Config, registry: Arc<dyn AuthorizationRegistry>) -> Result<Self, Error> {
        let wallet = config.signing_wallet()?;
        let ttl = i64::try_from(config.auth.token_expiration_hours)
            .ok()
            .and_then(Duration::try_hours)
            .ok_or_else(|| {
                Error::Config("auth.token_expiration_hours is out of range".to_string())
            })?;

        Ok(Self {
            challenges: ChallengeBuilder::new(&config.auth),
            verifier: ChallengeVerifier::new(config.auth.domain.clone()),
            issuer: TokenIssuer::new(wallet, ttl),
            domain: config.auth.domain.clone(),
            registry,
        })
    }

    /// Address tokens are signed with
    pub fn issuer_address(&self) -> Address {
        self.issuer.address()
    }

    /// Build a challenge for `address` to sign
    pub fn challenge(&self, address: &str) -> Result<ChallengeResponse, Error> {
        let challenge = self.challenges.build(address)?;

        debug!(target: "auth_service::challenge", address = %challenge.address, nonce = %challenge.nonce, "Challenge issued");

        Ok(ChallengeResponse {
            message: challenge.to_string(),
        })
    }

    /// Verify a signed challenge and mint a token for its signer
    pub fn login(&self, message: &str, signature: &str) -> Result<AuthenticationResult, Error> {
        let address = self
            .verifier
            .verify(message, signature)
            .inspect_err(|e| warn!(target: "auth_service::login", error = %e, "Challenge rejected"))?;

        let token = self.issuer.issue(&address.to_string(), &self.domain)?;

        debug!(target: "auth_service::login", address = %address, "Token issued");

        Ok(AuthenticationResult {
            address,
            token: Some(token),
        })
    }

    /// Validate `token` and return the address it was issued to
    ///
    /// Besides the token's own consistency, the token must have been signed
    /// by this service.
    pub fn verify_token(&self, token: &str) -> Result<Address, Error> {
        let verified = TokenVerifier::verify_at(token, &self.domain, Utc::now().timestamp())
            .inspect_err(
                |e| warn!(target: "auth_service::verify_token", error = %e, "Token rejected"),
            )?;

        if verified.issuer != self.issuer.address() {
            warn!(target: "auth_service::verify_token", issuer = %verified.issuer, "Token signed by a foreign issuer");
            return Err(AuthError::IssuerMismatch.into());
        }

        Ok(verified.subject)
    }

    /// Validate `token` and confirm its subject with the registry
    ///
    /// The registry is only consulted once the token is known to be valid.
    pub async fn authorize(&self, token: &str) -> Result<Address, Error> {
        let address = self.verify_token(token)?;

        match self.registry.is_authorized(&address).await {
            Ok(true) => {
                debug!(target: "auth_service::authorize", address = %address, "Address authorized");
                Ok(address)
            }
            Ok(false) => {
                warn!(target: "auth_service::authorize", address = %address, "Address not in registry");
                Err(Error::AuthorizationDenied)
            }
            Err(e) => {
                error!(target: "auth_service::authorize", address = %address, error = %e, "Registry lookup failed");
                Err(Error::CollaboratorUnavailable(e.to_string()))
            }
        }
    }
}
