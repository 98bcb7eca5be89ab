//! Configuration constants for the wallet guard


/// Default server configuration
pub mod server {
    /// Default HTTP listening host
    pub const DEFAULT_HOST: &str = "127.0.0.1";

    /// Default HTTP server port
    pub const DEFAULT_PORT: u16 = 5000;

    /// Service name reported by the health endpoint and used in JSON logs
    pub const SERVICE_NAME: &str = "wallet-guard";
}

/// Authentication protocol defaults
pub mod auth {
    /// Default URI presented in challenges
    pub const DEFAULT_LOGIN_URI: &str = "http://localhost:5000/login";

    /// Default service domain
    pub const DEFAULT_DOMAIN: &str = "localhost";

    /// Default chain id (local development chain)
    pub const DEFAULT_CHAIN_ID: u64 = 31337;

    /// SIWE message version
    pub const DEFAULT_SIWE_VERSION: &str = "1";

    /// Default statement shown to the user when signing
    pub const DEFAULT_STATEMENT: &str = "Sign in to access the service.";

    /// How long a challenge can be signed and submitted, in seconds
    pub const DEFAULT_CHALLENGE_EXPIRATION_SECS: u64 = 300;

    /// Upper bound accepted for `challenge_expiration_secs` (one day)
    pub const MAX_CHALLENGE_EXPIRATION_SECS: u64 = 86_400;

    /// How long an issued token is valid, in hours
    pub const DEFAULT_TOKEN_EXPIRATION_HOURS: u64 = 3;

    /// Upper bound accepted for `token_expiration_hours` (one year)
    pub const MAX_TOKEN_EXPIRATION_HOURS: u64 = 8_760;

    /// Length of challenge and token nonces (alphanumeric characters)
    pub const NONCE_LENGTH: usize = 17;
}

/// Registry RPC client configuration
pub mod registry {
    /// Default Ethereum JSON-RPC URL
    pub const DEFAULT_RPC_URL: &str = "http://localhost:8545";

    /// Default RPC request timeout in seconds
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Signature of the registry view function
    pub const IS_VALID_USER_SIGNATURE: &str = "isValidUser(address)";
}

/// API routes
pub mod api {
    pub const HEALTH_ENDPOINT: &str = "/health";
    pub const CHALLENGE_ENDPOINT: &str = "/authenticate/request";
    pub const VERIFY_ENDPOINT: &str = "/authenticate/verify";
    pub const TOKEN_VERIFY_ENDPOINT: &str = "/token/verify";
    pub const PROTECTED_ENDPOINT: &str = "/protected";
}
