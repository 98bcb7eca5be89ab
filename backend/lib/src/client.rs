//! HTTP client for a running guard
//!
//! Performs the login handshake on behalf of a wallet and presents the
//! resulting token, the same way a relying service or end user would.

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{
    auth::{AuthError, Wallet},
    constants::api::{
        CHALLENGE_ENDPOINT, HEALTH_ENDPOINT, PROTECTED_ENDPOINT, TOKEN_VERIFY_ENDPOINT,
        VERIFY_ENDPOINT,
    },
    models::auth::{
        AuthenticationResult, ChallengeRequest, ChallengeResponse, ProtectedResponse,
        SignedMessage,
    },
};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The guard answered with an error status
    #[error("Guard rejected the request ({status}): {message}")]
    Rejected { status: StatusCode, message: String },

    #[error("Guard response is missing the token")]
    MissingToken,

    #[error(transparent)]
    Signing(#[from] AuthError),
}

#[derive(Debug, Clone)]
pub struct GuardClient {
    base_url: String,
    http: Client,
}

impl GuardClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, http: Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, http }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Whether the guard answers its health endpoint
    pub async fn is_healthy(&self) -> bool {
        matches!(
            self.http.get(self.url(HEALTH_ENDPOINT)).send().await,
            Ok(response) if response.status().is_success()
        )
    }

    pub async fn request_challenge(&self, address: &str) -> Result<String, ClientError> {
        let response = self
            .http
            .post(self.url(CHALLENGE_ENDPOINT))
            .json(&ChallengeRequest {
                address: address.to_string(),
            })
            .send()
            .await?;

        let challenge: ChallengeResponse = parse(response).await?;
        Ok(challenge.message)
    }

    pub async fn submit_signature(
        &self,
        message: &str,
        signature: &str,
    ) -> Result<AuthenticationResult, ClientError> {
        let response = self
            .http
            .post(self.url(VERIFY_ENDPOINT))
            .json(&SignedMessage {
                message: message.to_string(),
                signature: signature.to_string(),
            })
            .send()
            .await?;

        parse(response).await
    }

    /// Ask the guard whether `token` is valid and its holder registered
    pub async fn verify_token(&self, token: &str) -> Result<AuthenticationResult, ClientError> {
        let response = self
            .http
            .get(self.url(&format!("{TOKEN_VERIFY_ENDPOINT}/{token}")))
            .send()
            .await?;

        parse(response).await
    }

    /// Full handshake for `wallet`, returning the issued token
    pub async fn authenticate(&self, wallet: &Wallet) -> Result<String, ClientError> {
        let address = wallet.address();
        debug!(target: "guard_client::authenticate", address = %address, "Requesting challenge");

        let message = self.request_challenge(&address.to_string()).await?;
        let signature = wallet.sign_hex(message.as_bytes())?;

        self.submit_signature(&message, &signature)
            .await?
            .token
            .ok_or(ClientError::MissingToken)
    }

    pub async fn fetch_protected(&self, token: &str) -> Result<ProtectedResponse, ClientError> {
        let response = self
            .http
            .get(self.url(PROTECTED_ENDPOINT))
            .bearer_auth(token)
            .send()
            .await?;

        parse(response).await
    }
}

/// Decode a success body, or turn the guard's `{error}` body into [`ClientError::Rejected`]
async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let body: serde_json::Value = response.json().await.unwrap_or_default();
    let message = body["error"]
        .as_str()
        .unwrap_or("no error message")
        .to_string();

    Err(ClientError::Rejected { status, message })
}
