use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use tracing::debug;

use crate::{
    error::Error,
    models::auth::{AuthenticationResult, ChallengeRequest, SignedMessage},
    services::Services,
};

pub async fn challenge(
    State(services): State<Services>,
    Json(payload): Json<ChallengeRequest>,
) -> Result<impl IntoResponse, Error> {
    debug!(address = %payload.address, "POST authenticate request");
    let response = services.auth.challenge(&payload.address)?;
    Ok(Json(response))
}

pub async fn verify(
    State(services): State<Services>,
    Json(payload): Json<SignedMessage>,
) -> Result<impl IntoResponse, Error> {
    debug!("POST authenticate verify");
    let response = services
        .auth
        .login(&payload.message, &payload.signature)?;
    Ok(Json(response))
}

pub async fn verify_token(
    State(services): State<Services>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, Error> {
    debug!("GET token verify");
    let address = services.auth.authorize(&token).await?;
    Ok(Json(AuthenticationResult {
        address,
        token: None,
    }))
}
