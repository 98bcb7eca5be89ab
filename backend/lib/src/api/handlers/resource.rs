use axum::{response::IntoResponse, Json};
use tracing::debug;

use crate::{error::Error, models::auth::ProtectedResponse, services::auth::AuthenticatedUser};

/// Resource only registered wallets may read
pub async fn protected(
    AuthenticatedUser { address }: AuthenticatedUser,
) -> Result<impl IntoResponse, Error> {
    debug!(user = %address, "GET protected");
    Ok(Json(ProtectedResponse {
        address,
        message: format!("Welcome {}", address.to_checksum(None)),
    }))
}
