//! Sign-In with Ethereum (EIP-4361) challenges
//!
//! The guard never stores the challenges it hands out: everything needed to
//! validate one (address, domain, expiration) travels inside the message
//! that the wallet signs.

use std::{fmt, str::FromStr};

use alloy_core::primitives::Address;
use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use rand::{distributions::Alphanumeric, Rng};
use tracing::debug;

use super::{
    address::{checksummed, parse_address},
    wallet::{decode_hex_signature, recover_address},
    AuthError,
};
use crate::{config::AuthConfig, constants::auth::NONCE_LENGTH};

const HEADER_SUFFIX: &str = " wants you to sign in with your Ethereum account:";
const URI_TAG: &str = "URI: ";
const VERSION_TAG: &str = "Version: ";
const CHAIN_ID_TAG: &str = "Chain ID: ";
const NONCE_TAG: &str = "Nonce: ";
const ISSUED_AT_TAG: &str = "Issued At: ";
const EXPIRATION_TIME_TAG: &str = "Expiration Time: ";

/// A one-time authentication request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeMessage {
    pub domain: String,
    pub address: Address,
    pub statement: Option<String>,
    pub uri: String,
    pub version: String,
    pub chain_id: u64,
    pub nonce: String,
    pub issued_at: DateTime<Utc>,
    pub expiration_time: DateTime<Utc>,
}

impl ChallengeMessage {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiration_time
    }
}

impl fmt::Display for ChallengeMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}{HEADER_SUFFIX}", self.domain)?;
        writeln!(f, "{}", checksummed(&self.address))?;
        writeln!(f)?;
        if let Some(statement) = &self.statement {
            writeln!(f, "{statement}")?;
            writeln!(f)?;
        }
        writeln!(f, "{URI_TAG}{}", self.uri)?;
        writeln!(f, "{VERSION_TAG}{}", self.version)?;
        writeln!(f, "{CHAIN_ID_TAG}{}", self.chain_id)?;
        writeln!(f, "{NONCE_TAG}{}", self.nonce)?;
        writeln!(f, "{ISSUED_AT_TAG}{}", format_timestamp(&self.issued_at))?;
        write!(
            f,
            "{EXPIRATION_TIME_TAG}{}",
            format_timestamp(&self.expiration_time)
        )
    }
}

impl FromStr for ChallengeMessage {
    type Err = AuthError;

    /// Strict parser for the layout produced by [`fmt::Display`]
    fn from_str(message: &str) -> Result<Self, Self::Err> {
        let mut lines = message.split('\n');
        let mut next_line = |what: &str| {
            lines
                .next()
                .ok_or_else(|| invalid(format!("missing {what}")))
        };

        let domain = next_line("header")?
            .strip_suffix(HEADER_SUFFIX)
            .filter(|domain| !domain.is_empty())
            .ok_or_else(|| invalid("malformed header line"))?
            .to_string();

        let address = parse_address(next_line("address")?)
            .map_err(|_| invalid("malformed address line"))?;

        if !next_line("blank line")?.is_empty() {
            return Err(invalid("expected a blank line after the address"));
        }

        // the statement is optional and followed by a blank line
        let mut line = next_line("URI")?;
        let statement = match line.strip_prefix(URI_TAG) {
            Some(_) => None,
            None => {
                let statement = line.to_string();
                if !next_line("blank line")?.is_empty() {
                    return Err(invalid("expected a blank line after the statement"));
                }
                line = next_line("URI")?;
                Some(statement)
            }
        };

        let uri = tagged(line, URI_TAG)?.to_string();
        let version = tagged(next_line("version")?, VERSION_TAG)?.to_string();
        let chain_id = tagged(next_line("chain id")?, CHAIN_ID_TAG)?
            .parse::<u64>()
            .map_err(|_| invalid("malformed chain id"))?;
        let nonce = tagged(next_line("nonce")?, NONCE_TAG)?.to_string();
        let issued_at = parse_timestamp(tagged(next_line("issued at")?, ISSUED_AT_TAG)?)?;
        let expiration_time =
            parse_timestamp(tagged(next_line("expiration time")?, EXPIRATION_TIME_TAG)?)?;

        if lines.next().is_some() {
            return Err(invalid("unexpected trailing content"));
        }

        if nonce.len() < NONCE_LENGTH || !nonce.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(invalid("malformed nonce"));
        }

        if expiration_time <= issued_at {
            return Err(invalid("expiration time must be after issued at"));
        }

        Ok(Self {
            domain,
            address,
            statement,
            uri,
            version,
            chain_id,
            nonce,
            issued_at,
            expiration_time,
        })
    }
}

/// Builds fresh challenges for the service identity it was created with
#[derive(Debug, Clone)]
pub struct ChallengeBuilder {
    domain: String,
    uri: String,
    version: String,
    chain_id: u64,
    statement: Option<String>,
    validity: Duration,
}

impl ChallengeBuilder {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            domain: config.domain.clone(),
            uri: config.uri.clone(),
            version: config.version.clone(),
            chain_id: config.chain_id,
            statement: config.statement.clone(),
            // out of range lifetimes fall back to zero, which `build_at` refuses
            validity: i64::try_from(config.challenge_expiration_secs)
                .ok()
                .and_then(Duration::try_seconds)
                .unwrap_or_else(Duration::zero),
        }
    }

    /// Build a challenge for `address`, valid from now
    pub fn build(&self, address: &str) -> Result<ChallengeMessage, AuthError> {
        self.build_at(address, Utc::now())
    }

    pub fn build_at(
        &self,
        address: &str,
        now: DateTime<Utc>,
    ) -> Result<ChallengeMessage, AuthError> {
        let address = parse_address(address)?;

        if self.validity <= Duration::zero() {
            return Err(invalid("challenge validity must be positive"));
        }

        // the rendered message only carries milliseconds
        let now = now.trunc_subsecs(3);
        let expiration_time = now
            .checked_add_signed(self.validity)
            .ok_or_else(|| invalid("challenge expiration is out of range"))?;

        Ok(ChallengeMessage {
            domain: self.domain.clone(),
            address,
            statement: self.statement.clone(),
            uri: self.uri.clone(),
            version: self.version.clone(),
            chain_id: self.chain_id,
            nonce: generate_nonce(),
            issued_at: now,
            expiration_time,
        })
    }
}

/// Validates signed challenges and recovers their signer
#[derive(Debug, Clone)]
pub struct ChallengeVerifier {
    domain: String,
}

impl ChallengeVerifier {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
        }
    }

    /// Verify `signature` over `message`, returning the authenticated address
    pub fn verify(&self, message: &str, signature: &str) -> Result<Address, AuthError> {
        self.verify_at(message, signature, Utc::now())
    }

    pub fn verify_at(
        &self,
        message: &str,
        signature: &str,
        now: DateTime<Utc>,
    ) -> Result<Address, AuthError> {
        let challenge = ChallengeMessage::from_str(message)?;

        // recover over the canonical rendering, never over caller-supplied framing
        let canonical = challenge.to_string();
        let signature =
            decode_hex_signature(signature).map_err(|e| invalid(format!("bad signature: {e}")))?;
        let signer = recover_address(canonical.as_bytes(), &signature)
            .map_err(|e| invalid(format!("bad signature: {e}")))?;

        if signer != challenge.address {
            debug!(
                target: "auth::challenge::verify",
                expected = %challenge.address,
                recovered = %signer,
                "Challenge signer mismatch"
            );
            return Err(invalid("signature does not match the challenge address"));
        }

        if challenge.domain != self.domain {
            return Err(invalid(format!(
                "challenge was issued for domain '{}'",
                challenge.domain
            )));
        }

        if challenge.is_expired_at(now) {
            return Err(invalid("challenge has expired"));
        }

        Ok(signer)
    }
}

/// Random alphanumeric nonce, unguessable within a challenge lifetime
pub fn generate_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LENGTH)
        .map(char::from)
        .collect()
}

fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, AuthError> {
    DateTime::parse_from_rfc3339(value)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|_| invalid(format!("malformed timestamp '{value}'")))
}

fn tagged<'a>(line: &'a str, tag: &str) -> Result<&'a str, AuthError> {
    line.strip_prefix(tag)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| invalid(format!("expected '{}' line", tag.trim_end_matches(": "))))
}

fn invalid(reason: impl Into<String>) -> AuthError {
    AuthError::ChallengeInvalid(reason.into())
}
