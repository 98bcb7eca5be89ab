//! Self-signed bearer tokens
//!
//! A token has the compact `header.payload.signature` shape of a JWT, each
//! segment base64url encoded. The signature is a wallet signature (EIP-191)
//! over the exact payload bytes, and the issuer is whoever it recovers to:
//! a token is authentic when the recovered address equals its `iss` claim.

use alloy_core::primitives::Address;
use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    address::{checksummed, is_address, parse_address},
    challenge::generate_nonce,
    wallet::{recover_address, Wallet, SIGNATURE_LENGTH},
    AuthError,
};

/// Algorithm tag declared in every token header
pub const TOKEN_ALGORITHM: &str = "ES256";

/// Type tag declared in every token header
pub const TOKEN_TYPE: &str = "JWT";

const SEGMENT_DELIMITER: char = '.';

/// URL-safe base64 without padding, tolerating padded input
const SEGMENT_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHeader {
    pub alg: String,
    pub typ: String,
}

impl Default for TokenHeader {
    fn default() -> Self {
        Self {
            alg: TOKEN_ALGORITHM.to_string(),
            typ: TOKEN_TYPE.to_string(),
        }
    }
}

/// The claim set carried by a token
///
/// Field order is the canonical serialization order, do not reorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenClaims {
    /// Authenticated wallet address
    pub sub: String,
    /// Relying party domain
    pub aud: String,
    /// Issuer address, only set while signing
    #[serde(default)]
    pub iss: String,
    pub nbf: i64,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

impl TokenClaims {
    /// Unsigned claims for `sub`, valid from `now` for `ttl`
    ///
    /// Fails before anything gets signed if `sub` is not a wallet address.
    pub fn create(
        sub: &str,
        aud: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Self, AuthError> {
        let sub = parse_address(sub)?;
        let issued_at = now.timestamp();
        let expires_at = now
            .checked_add_signed(ttl)
            .filter(|expires_at| *expires_at > now)
            .ok_or_else(|| AuthError::Signing("token lifetime is out of range".to_string()))?;

        Ok(Self {
            sub: checksummed(&sub),
            aud: aud.to_string(),
            iss: String::new(),
            nbf: issued_at,
            exp: expires_at.timestamp(),
            iat: issued_at,
            jti: generate_nonce(),
        })
    }

    /// Canonical serialization: declaration order, no whitespace
    pub fn to_canonical_bytes(&self) -> Result<Vec<u8>, AuthError> {
        serde_json::to_vec(self).map_err(|e| AuthError::Signing(e.to_string()))
    }
}

/// A token split into its decoded segments
///
/// Nothing in here is trusted: `payload` are the exact bytes that were signed,
/// `claims` is only a typed view over them.
#[derive(Debug, Clone)]
pub struct DecodedToken {
    pub header: TokenHeader,
    pub claims: TokenClaims,
    pub payload: Vec<u8>,
    pub signature: Vec<u8>,
}

impl DecodedToken {
    pub fn decode(token: &str) -> Result<Self, AuthError> {
        let segments: Vec<&str> = token.split(SEGMENT_DELIMITER).collect();
        let [header, payload, signature] = segments[..] else {
            return Err(malformed(format!(
                "expected 3 segments, got {}",
                segments.len()
            )));
        };

        let header: TokenHeader = serde_json::from_slice(&decode_segment(header, "header")?)
            .map_err(|_| malformed("header is not valid JSON"))?;
        if header.alg != TOKEN_ALGORITHM || header.typ != TOKEN_TYPE {
            return Err(malformed(format!(
                "unsupported header {}/{}",
                header.alg, header.typ
            )));
        }

        let payload = decode_segment(payload, "payload")?;
        let claims: TokenClaims = serde_json::from_slice(&payload)
            .map_err(|e| malformed(format!("invalid claims: {e}")))?;

        let signature = decode_segment(signature, "signature")?;
        if signature.len() != SIGNATURE_LENGTH {
            return Err(malformed(format!(
                "signature must be {SIGNATURE_LENGTH} bytes"
            )));
        }

        Ok(Self {
            header,
            claims,
            payload,
            signature,
        })
    }

    /// Address that signed the payload
    pub fn signer(&self) -> Result<Address, AuthError> {
        recover_address(&self.payload, &self.signature).map_err(|e| {
            debug!(target: "auth::token::signer", error = %e, "Unable to recover token signer");
            AuthError::IssuerMismatch
        })
    }
}

/// Mints tokens signed with the service wallet
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    wallet: Wallet,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(wallet: Wallet, ttl: Duration) -> Self {
        Self { wallet, ttl }
    }

    /// Address every issued token declares as `iss`
    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    /// Issue a token for `subject`, valid for `audience` from now
    pub fn issue(&self, subject: &str, audience: &str) -> Result<String, AuthError> {
        let claims = TokenClaims::create(subject, audience, Utc::now(), self.ttl)?;
        self.sign(claims)
    }

    /// Sign `claims` as they are, overwriting `iss` with the issuer address
    pub fn sign(&self, mut claims: TokenClaims) -> Result<String, AuthError> {
        claims.iss = checksummed(&self.wallet.address());

        let header = serde_json::to_vec(&TokenHeader::default())
            .map_err(|e| AuthError::Signing(e.to_string()))?;
        let payload = claims.to_canonical_bytes()?;
        let signature = self.wallet.sign(&payload)?;

        Ok(format!(
            "{}{SEGMENT_DELIMITER}{}{SEGMENT_DELIMITER}{}",
            SEGMENT_ENGINE.encode(header),
            SEGMENT_ENGINE.encode(payload),
            SEGMENT_ENGINE.encode(signature)
        ))
    }
}

/// A token that passed every check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedToken {
    /// Wallet the token was issued to
    pub subject: Address,
    /// Wallet that signed the token, equal to its `iss` claim
    pub issuer: Address,
}

/// Validates tokens, trusting nothing but signature recovery and the clock
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenVerifier;

impl TokenVerifier {
    /// Validate `token` for `domain`, returning its subject
    pub fn verify(token: &str, domain: &str) -> Result<Address, AuthError> {
        Self::verify_at(token, domain, Utc::now().timestamp()).map(|verified| verified.subject)
    }

    /// Validate `token` for `domain` at the unix timestamp `now`
    ///
    /// Checks run in a fixed order and stop at the first failure. The signer
    /// is recovered once and handed back alongside the subject.
    pub fn verify_at(token: &str, domain: &str, now: i64) -> Result<VerifiedToken, AuthError> {
        let decoded = DecodedToken::decode(token)?;
        let signer = decoded.signer()?;
        let claims = &decoded.claims;

        // `iss` only means something once we know who actually signed
        let issuer = parse_address(&claims.iss).map_err(|_| AuthError::IssuerMismatch)?;
        if signer != issuer {
            return Err(AuthError::IssuerMismatch);
        }

        if now < claims.nbf {
            return Err(AuthError::TokenNotYetValid);
        }

        if claims.aud != domain {
            return Err(AuthError::AudienceMismatch);
        }

        if now > claims.exp {
            return Err(AuthError::TokenExpired);
        }

        if !is_address(&claims.sub) {
            return Err(AuthError::InvalidSubject(
                "token subject is not a wallet address".to_string(),
            ));
        }

        Ok(VerifiedToken {
            subject: parse_address(&claims.sub)?,
            issuer: signer,
        })
    }
}

fn decode_segment(segment: &str, name: &str) -> Result<Vec<u8>, AuthError> {
    SEGMENT_ENGINE
        .decode(segment)
        .map_err(|_| malformed(format!("{name} is not valid base64url")))
}

fn malformed(reason: impl Into<String>) -> AuthError {
    AuthError::TokenMalformed(reason.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    const AUDIENCE: &str = "a.example";

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(Wallet::random(), Duration::hours(3))
    }

    fn claims_for(subject: &Wallet, nbf: i64, exp: i64) -> TokenClaims {
        TokenClaims {
            sub: subject.address().to_string(),
            aud: AUDIENCE.to_string(),
            iss: String::new(),
            nbf,
            exp,
            iat: nbf,
            jti: generate_nonce(),
        }
    }

    fn segments(token: &str) -> Vec<String> {
        token.split('.').map(str::to_string).collect()
    }

    fn payload_of(token: &str) -> TokenClaims {
        let payload = SEGMENT_ENGINE.decode(&segments(token)[1]).unwrap();
        serde_json::from_slice(&payload).unwrap()
    }

    fn with_payload(token: &str, claims: &TokenClaims) -> String {
        let mut parts = segments(token);
        parts[1] = SEGMENT_ENGINE.encode(serde_json::to_vec(claims).unwrap());
        parts.join(".")
    }

    #[test]
    fn issued_token_verifies_to_subject() {
        let issuer = issuer();
        let subject = Wallet::random();

        let token = issuer
            .issue(&subject.address().to_string(), AUDIENCE)
            .unwrap();

        assert_eq!(
            TokenVerifier::verify(&token, AUDIENCE).unwrap(),
            subject.address()
        );
    }

    #[test]
    fn issued_token_shape() {
        let issuer = issuer();
        let subject = Wallet::random();
        let token = issuer
            .issue(&subject.address().to_string().to_lowercase(), AUDIENCE)
            .unwrap();

        let parts = segments(&token);
        assert_eq!(parts.len(), 3);
        assert!(parts.iter().all(|part| !part.contains('=')));

        let header: TokenHeader =
            serde_json::from_slice(&SEGMENT_ENGINE.decode(&parts[0]).unwrap()).unwrap();
        assert_eq!(header, TokenHeader::default());

        let claims = payload_of(&token);
        assert_eq!(claims.iss, issuer.address().to_checksum(None));
        assert_eq!(claims.sub, subject.address().to_checksum(None));
        assert_eq!(claims.nbf, claims.iat);
        assert_eq!(claims.exp - claims.iat, 3 * 3600);
        assert!(!claims.jti.is_empty());

        let decoded = DecodedToken::decode(&token).unwrap();
        assert_eq!(decoded.signer().unwrap(), issuer.address());
    }

    #[test]
    fn canonical_serialization() {
        let claims = TokenClaims {
            sub: "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".to_string(),
            aud: "a.example".to_string(),
            iss: "0x70997970C51812dc3A010C7d01b50e0d17dc79C8".to_string(),
            nbf: 1,
            exp: 3,
            iat: 2,
            jti: "nonce".to_string(),
        };

        assert_eq!(
            String::from_utf8(claims.to_canonical_bytes().unwrap()).unwrap(),
            r#"{"sub":"0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266","aud":"a.example","iss":"0x70997970C51812dc3A010C7d01b50e0d17dc79C8","nbf":1,"exp":3,"iat":2,"jti":"nonce"}"#
        );
    }

    #[test]
    fn create_rejects_bad_subject() {
        let result = TokenClaims::create("not an address", AUDIENCE, Utc::now(), Duration::hours(1));
        assert!(matches!(result, Err(AuthError::InvalidSubject(_))));

        assert!(matches!(
            issuer().issue("not an address", AUDIENCE),
            Err(AuthError::InvalidSubject(_))
        ));
    }

    #[test]
    fn create_rejects_out_of_range_lifetime() {
        let subject = Wallet::random().address().to_string();

        for ttl in [Duration::MAX, Duration::zero(), Duration::hours(-1)] {
            assert!(matches!(
                TokenClaims::create(&subject, AUDIENCE, Utc::now(), ttl),
                Err(AuthError::Signing(_))
            ));
        }

        let issuer = TokenIssuer::new(Wallet::random(), Duration::hours(3_000_000_000));
        assert!(matches!(
            issuer.issue(&subject, AUDIENCE),
            Err(AuthError::Signing(_))
        ));
    }

    #[test]
    fn tampered_payload_is_issuer_mismatch() {
        let issuer = issuer();
        let subject = Wallet::random();
        let token = issuer
            .issue(&subject.address().to_string(), AUDIENCE)
            .unwrap();

        let mut claims = payload_of(&token);
        claims.sub = Wallet::random().address().to_string();
        assert_eq!(
            TokenVerifier::verify(&with_payload(&token, &claims), AUDIENCE),
            Err(AuthError::IssuerMismatch)
        );

        let mut claims = payload_of(&token);
        claims.exp += 1;
        assert_eq!(
            TokenVerifier::verify(&with_payload(&token, &claims), AUDIENCE),
            Err(AuthError::IssuerMismatch)
        );
    }

    #[test]
    fn forged_issuer_is_rejected() {
        let legit = issuer();
        let forger = issuer();
        let subject = Wallet::random();

        // forger signs a payload claiming to come from the legit issuer
        let token = forger
            .issue(&subject.address().to_string(), AUDIENCE)
            .unwrap();
        let mut claims = payload_of(&token);
        claims.iss = legit.address().to_string();
        let payload = serde_json::to_vec(&claims).unwrap();
        let signature = forger.wallet.sign(&payload).unwrap();

        let mut parts = segments(&token);
        parts[1] = SEGMENT_ENGINE.encode(&payload);
        parts[2] = SEGMENT_ENGINE.encode(signature);

        assert_eq!(
            TokenVerifier::verify(&parts.join("."), AUDIENCE),
            Err(AuthError::IssuerMismatch)
        );
    }

    #[test]
    fn issuer_comparison_ignores_case() {
        let issuer = issuer();
        let subject = Wallet::random();
        let now = Utc::now().timestamp();

        // sign manually so `iss` stays lowercase in the signed bytes
        let mut claims = claims_for(&subject, now, now + 60);
        claims.iss = issuer.address().to_string().to_lowercase();
        let payload = serde_json::to_vec(&claims).unwrap();
        let signature = issuer.wallet.sign(&payload).unwrap();
        let token = format!(
            "{}.{}.{}",
            SEGMENT_ENGINE.encode(serde_json::to_vec(&TokenHeader::default()).unwrap()),
            SEGMENT_ENGINE.encode(&payload),
            SEGMENT_ENGINE.encode(signature)
        );

        assert_eq!(
            TokenVerifier::verify(&token, AUDIENCE).unwrap(),
            subject.address()
        );
    }

    #[test]
    fn expiry_boundary() {
        let issuer = issuer();
        let subject = Wallet::random();
        let now = Utc::now().timestamp();

        let expired = issuer.sign(claims_for(&subject, now - 3600, now - 1)).unwrap();
        assert_eq!(
            TokenVerifier::verify_at(&expired, AUDIENCE, now),
            Err(AuthError::TokenExpired)
        );

        let fresh = issuer.sign(claims_for(&subject, now - 3600, now + 1)).unwrap();
        assert_eq!(
            TokenVerifier::verify_at(&fresh, AUDIENCE, now).unwrap(),
            VerifiedToken {
                subject: subject.address(),
                issuer: issuer.address(),
            }
        );
    }

    #[test]
    fn not_before_boundary() {
        let issuer = issuer();
        let subject = Wallet::random();
        let now = Utc::now().timestamp();

        let early = issuer
            .sign(claims_for(&subject, now + 3600, now + 3 * 3600))
            .unwrap();
        assert_eq!(
            TokenVerifier::verify_at(&early, AUDIENCE, now),
            Err(AuthError::TokenNotYetValid)
        );
    }

    #[test]
    fn audience_enforced() {
        let issuer = issuer();
        let subject = Wallet::random();
        let token = issuer
            .issue(&subject.address().to_string(), "a.example")
            .unwrap();

        assert_eq!(
            TokenVerifier::verify(&token, "b.example"),
            Err(AuthError::AudienceMismatch)
        );
    }

    #[test]
    fn checks_run_in_order() {
        let issuer = issuer();
        let subject = Wallet::random();
        let now = Utc::now().timestamp();

        // not yet valid wins over a wrong audience
        let early = issuer
            .sign(claims_for(&subject, now + 3600, now + 7200))
            .unwrap();
        assert_eq!(
            TokenVerifier::verify_at(&early, "b.example", now),
            Err(AuthError::TokenNotYetValid)
        );

        // wrong audience wins over expiry
        let expired = issuer.sign(claims_for(&subject, now - 7200, now - 3600)).unwrap();
        assert_eq!(
            TokenVerifier::verify_at(&expired, "b.example", now),
            Err(AuthError::AudienceMismatch)
        );
    }

    #[test]
    fn bad_subject_is_last_check() {
        let issuer = issuer();
        let subject = Wallet::random();
        let now = Utc::now().timestamp();

        let mut claims = claims_for(&subject, now, now + 60);
        claims.sub = String::new();
        let token = issuer.sign(claims).unwrap();

        assert!(matches!(
            TokenVerifier::verify_at(&token, AUDIENCE, now),
            Err(AuthError::InvalidSubject(_))
        ));
    }

    #[test]
    fn malformed_tokens() {
        let issuer = issuer();
        let subject = Wallet::random();
        let token = issuer
            .issue(&subject.address().to_string(), AUDIENCE)
            .unwrap();
        let parts = segments(&token);

        let two_segments = format!("{}.{}", parts[0], parts[1]);
        let four_segments = format!("{token}.{}", parts[2]);
        let bad_base64 = format!("{}.!!!.{}", parts[0], parts[2]);
        let not_json = format!(
            "{}.{}.{}",
            parts[0],
            SEGMENT_ENGINE.encode("not json"),
            parts[2]
        );
        let unknown_field = {
            let mut claims = serde_json::to_value(payload_of(&token)).unwrap();
            claims["admin"] = serde_json::Value::Bool(true);
            format!(
                "{}.{}.{}",
                parts[0],
                SEGMENT_ENGINE.encode(claims.to_string()),
                parts[2]
            )
        };
        let short_signature = format!("{}.{}.{}", parts[0], parts[1], SEGMENT_ENGINE.encode([0u8; 10]));
        let wrong_header = format!(
            "{}.{}.{}",
            SEGMENT_ENGINE.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
            parts[1],
            parts[2]
        );

        let tokens: [&str; 9] = [
            "bad",
            "",
            &two_segments,
            &four_segments,
            &bad_base64,
            &not_json,
            &unknown_field,
            &short_signature,
            &wrong_header,
        ];
        for bad in tokens {
            assert!(
                matches!(
                    TokenVerifier::verify(bad, AUDIENCE),
                    Err(AuthError::TokenMalformed(_))
                ),
                "{bad:?} should be malformed"
            );
        }
    }

    #[test]
    fn padded_segments_are_accepted() {
        let issuer = issuer();
        let subject = Wallet::random();
        let token = issuer
            .issue(&subject.address().to_string(), AUDIENCE)
            .unwrap();

        let padded = segments(&token)
            .into_iter()
            .map(|part| {
                let padding = (4 - part.len() % 4) % 4;
                format!("{part}{}", "=".repeat(padding))
            })
            .collect::<Vec<_>>()
            .join(".");

        assert_eq!(
            TokenVerifier::verify(&padded, AUDIENCE).unwrap(),
            subject.address()
        );
    }
}
