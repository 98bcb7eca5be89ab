use alloy_core::primitives::Address;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use tracing::{debug, warn};

use crate::{error::Error, services::Services};

/// Axum extractor for callers presenting a valid bearer token
///
/// The token must verify and its subject must be authorized by the registry.
/// A registry that cannot be reached is reported as such, not as a rejection.
pub struct AuthenticatedUser {
    pub address: Address,
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Services: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let services = Services::from_ref(state);

        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    Error::Unauthorized("No authentication token provided".to_owned())
                })?;

        match services.auth.authorize(bearer.token()).await {
            Ok(address) => {
                debug!(target: "auth_service::from_request_parts", address = %address, "Bearer accepted");
                Ok(Self { address })
            }
            // only an unreachable registry is not the caller's fault
            Err(e @ Error::CollaboratorUnavailable(_)) => Err(e),
            Err(e) => {
                warn!(target: "auth_service::from_request_parts", error = %e, "Bearer rejected");
                Err(Error::Unauthorized(e.to_string()))
            }
        }
    }
}
