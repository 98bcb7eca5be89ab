use std::io::IsTerminal;

use serde::{Deserialize, Serialize};

use crate::{
    auth::{parse_address, Wallet},
    constants::{
        auth::{
            DEFAULT_CHAIN_ID, DEFAULT_CHALLENGE_EXPIRATION_SECS, DEFAULT_DOMAIN,
            DEFAULT_LOGIN_URI, DEFAULT_SIWE_VERSION, DEFAULT_STATEMENT,
            DEFAULT_TOKEN_EXPIRATION_HOURS, MAX_CHALLENGE_EXPIRATION_SECS,
            MAX_TOKEN_EXPIRATION_HOURS,
        },
        registry::{DEFAULT_RPC_URL, DEFAULT_TIMEOUT_SECS},
        server::{DEFAULT_HOST, DEFAULT_PORT},
    },
    error::Error,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub log_format: LogFormat,
    pub auth: AuthConfig,
    pub registry: RegistryConfig,
}

/// Service identity and token policy
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// URI presented in challenges (e.g. the login endpoint)
    pub uri: String,
    /// Domain challenges are issued for and tokens are audienced to
    pub domain: String,
    pub chain_id: u64,
    /// SIWE message version
    pub version: String,
    /// Optional human readable statement included in challenges
    #[serde(default)]
    pub statement: Option<String>,
    pub challenge_expiration_secs: u64,
    /// Hex encoded private key used to sign tokens
    pub signing_key: String,
    pub token_expiration_hours: u64,
}

// the signing key must never end up in logs
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("uri", &self.uri)
            .field("domain", &self.domain)
            .field("chain_id", &self.chain_id)
            .field("version", &self.version)
            .field("statement", &self.statement)
            .field("challenge_expiration_secs", &self.challenge_expiration_secs)
            .field("signing_key", &"<redacted>")
            .field("token_expiration_hours", &self.token_expiration_hours)
            .finish()
    }
}

/// On-chain authorization registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// JSON-RPC endpoint of an Ethereum node
    pub rpc_url: String,
    /// Address of the registry contract
    pub contract_address: String,
    pub timeout_secs: Option<u64>,
    #[cfg(feature = "mocks")]
    #[serde(default)]
    pub mock_mode: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON when stdout is not a terminal, text otherwise
    #[default]
    Auto,
    Json,
    Text,
}

impl LogFormat {
    pub fn resolve(self) -> Self {
        match self {
            Self::Auto if std::io::stdout().is_terminal() => Self::Text,
            Self::Auto => Self::Json,
            other => other,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        // development defaults, the signing key has to be provided
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            log_format: LogFormat::Auto,
            auth: AuthConfig {
                uri: DEFAULT_LOGIN_URI.to_string(),
                domain: DEFAULT_DOMAIN.to_string(),
                chain_id: DEFAULT_CHAIN_ID,
                version: DEFAULT_SIWE_VERSION.to_string(),
                statement: Some(DEFAULT_STATEMENT.to_string()),
                challenge_expiration_secs: DEFAULT_CHALLENGE_EXPIRATION_SECS,
                signing_key: String::new(),
                token_expiration_hours: DEFAULT_TOKEN_EXPIRATION_HOURS,
            },
            registry: RegistryConfig {
                rpc_url: DEFAULT_RPC_URL.to_string(),
                contract_address: String::new(),
                timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
                #[cfg(feature = "mocks")]
                mock_mode: true,
            },
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> std::io::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Checks every required value, so that a bad configuration stops the
    /// process at startup instead of failing requests later on
    pub fn validate(&self) -> Result<(), Error> {
        let auth = &self.auth;

        for (name, value) in [
            ("auth.uri", &auth.uri),
            ("auth.domain", &auth.domain),
            ("auth.version", &auth.version),
        ] {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("{name} must be set")));
            }
        }

        for (name, value) in [("auth.uri", &auth.uri), ("auth.version", &auth.version)] {
            if value.contains(['\r', '\n']) {
                return Err(Error::Config(format!("{name} must be a single line")));
            }
        }

        if auth.domain.contains(char::is_whitespace) {
            return Err(Error::Config("auth.domain must not contain whitespace".to_string()));
        }

        if auth
            .statement
            .as_deref()
            .is_some_and(|statement| statement.is_empty() || statement.contains('\n'))
        {
            return Err(Error::Config(
                "auth.statement must be a single non-empty line".to_string(),
            ));
        }

        if !(1..=MAX_CHALLENGE_EXPIRATION_SECS).contains(&auth.challenge_expiration_secs) {
            return Err(Error::Config(format!(
                "auth.challenge_expiration_secs must be between 1 and {MAX_CHALLENGE_EXPIRATION_SECS}"
            )));
        }

        if !(1..=MAX_TOKEN_EXPIRATION_HOURS).contains(&auth.token_expiration_hours) {
            return Err(Error::Config(format!(
                "auth.token_expiration_hours must be between 1 and {MAX_TOKEN_EXPIRATION_HOURS}"
            )));
        }

        self.signing_wallet()?;

        if !self.registry_is_mocked() {
            if self.registry.rpc_url.trim().is_empty() {
                return Err(Error::Config("registry.rpc_url must be set".to_string()));
            }
            parse_address(&self.registry.contract_address).map_err(|_| {
                Error::Config("registry.contract_address must be a valid address".to_string())
            })?;
        }

        Ok(())
    }

    /// The wallet tokens are signed with
    pub fn signing_wallet(&self) -> Result<Wallet, Error> {
        if self.auth.signing_key.trim().is_empty() {
            return Err(Error::Config("auth.signing_key must be set".to_string()));
        }

        // the underlying error may echo key material
        Wallet::from_hex(&self.auth.signing_key)
            .map_err(|_| Error::Config("auth.signing_key is not a valid private key".to_string()))
    }

    #[cfg(feature = "mocks")]
    pub fn registry_is_mocked(&self) -> bool {
        self.registry.mock_mode
    }

    #[cfg(not(feature = "mocks"))]
    pub fn registry_is_mocked(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::test::{DEV_SIGNING_KEY, REGISTRY_CONTRACT};

    fn valid() -> Config {
        let mut config = Config::default();
        config.auth.signing_key = DEV_SIGNING_KEY.to_string();
        config.registry.contract_address = REGISTRY_CONTRACT.to_string();
        config
    }

    #[test]
    fn default_requires_signing_key() {
        assert!(matches!(Config::default().validate(), Err(Error::Config(_))));
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn rejects_bad_values() {
        let mut config = valid();
        config.auth.signing_key = "0x1234".to_string();
        assert!(config.validate().is_err());

        let mut config = valid();
        config.auth.domain = String::new();
        assert!(config.validate().is_err());

        let mut config = valid();
        config.auth.statement = Some("two\nlines".to_string());
        assert!(config.validate().is_err());

        let mut config = valid();
        config.auth.token_expiration_hours = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_multiline_uri_and_version() {
        let mut config = valid();
        config.auth.uri = "http://a\nb".to_string();
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = valid();
        config.auth.version = "1\n".to_string();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn rejects_out_of_range_lifetimes() {
        let mut config = valid();
        config.auth.challenge_expiration_secs = 10_000_000_000_000;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = valid();
        config.auth.challenge_expiration_secs = u64::MAX;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = valid();
        config.auth.token_expiration_hours = 2_000_000_000_000;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = valid();
        config.auth.challenge_expiration_secs = MAX_CHALLENGE_EXPIRATION_SECS;
        config.auth.token_expiration_hours = MAX_TOKEN_EXPIRATION_HOURS;
        assert!(config.validate().is_ok());
    }

    #[cfg(feature = "mocks")]
    #[test]
    fn real_registry_needs_contract() {
        let mut config = valid();
        config.registry.mock_mode = false;
        assert!(config.validate().is_ok());

        config.registry.contract_address = "0x".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_redacts_signing_key() {
        let rendered = format!("{:?}", valid());
        assert!(!rendered.contains(&DEV_SIGNING_KEY[2..]));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn parses_toml() {
        let config: Config = toml::from_str(
            r#"
            host = "0.0.0.0"
            port = 5000
            log_format = "json"

            [auth]
            uri = "https://guard.example/login"
            domain = "guard.example"
            chain_id = 1
            version = "1"
            challenge_expiration_secs = 120
            signing_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
            token_expiration_hours = 6

            [registry]
            rpc_url = "http://localhost:8545"
            contract_address = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
            timeout_secs = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 5000);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.auth.statement, None);
        assert_eq!(config.auth.token_expiration_hours, 6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_auth_section_is_an_error() {
        let result = toml::from_str::<Config>(
            r#"
            host = "0.0.0.0"
            port = 5000
            "#,
        );
        assert!(result.is_err());
    }
}
