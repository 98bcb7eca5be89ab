//! Route definitions for the guard API

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;
use crate::{constants::api::*, services::Services};

/// Creates the router with all API routes
pub fn routes(services: Services) -> Router {
    let token_verify = format!("{TOKEN_VERIFY_ENDPOINT}/{{token}}");

    Router::new()
        .route(HEALTH_ENDPOINT, get(handlers::health_check))
        // Login handshake
        .route(CHALLENGE_ENDPOINT, post(handlers::auth::challenge))
        .route(VERIFY_ENDPOINT, post(handlers::auth::verify))
        .route(&token_verify, get(handlers::auth::verify_token))
        // Bearer protected
        .route(PROTECTED_ENDPOINT, get(handlers::resource::protected))
        .with_state(services)
}
