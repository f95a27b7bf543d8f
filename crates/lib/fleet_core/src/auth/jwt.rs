// @zen-component: AUTH-TokenCodec
//
//! JWT token generation and parsing.
//!
//! Tokens are HS512-signed JWTs carrying `sub`, `role`, `iat` and `exp`.
//! The signing key is injected at construction and fixed for the lifetime of
//! the codec; a different key rejects every token issued under the old one.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use tracing::{info, warn};

use super::{AuthError, TokenError};
use crate::models::auth::{Identity, Role, TokenClaims};

/// Default token lifetime: 24 hours.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

/// Longest token lifetime accepted: 10 years.
pub const MAX_TOKEN_TTL_SECS: i64 = 10 * 365 * 24 * 60 * 60;

/// Shortest signing key accepted, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Prefix marking a base64-encoded secret value.
const BASE64_PREFIX: &str = "base64:";

const ALGORITHM: Algorithm = Algorithm::HS512;

/// Symmetric signing key material.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    /// Parse a configured secret. Values prefixed with `base64:` are decoded,
    /// anything else is used as raw UTF-8 bytes.
    pub fn parse(raw: &str) -> Result<Self, AuthError> {
        let bytes = match raw.strip_prefix(BASE64_PREFIX) {
            Some(encoded) => STANDARD
                .decode(encoded.trim())
                .map_err(|e| AuthError::Config(format!("JWT secret is not valid base64: {e}")))?,
            None => raw.as_bytes().to_vec(),
        };
        Self::from_bytes(bytes)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, AuthError> {
        if bytes.is_empty() {
            return Err(AuthError::Config("JWT secret is empty".into()));
        }
        if bytes.len() < MIN_SECRET_LEN {
            return Err(AuthError::Config(format!(
                "JWT secret must be at least {MIN_SECRET_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self(bytes))
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningSecret([REDACTED; {}])", self.0.len())
    }
}

/// Issues and parses signed, time-bounded identity tokens.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    validation: Arc<Validation>,
    ttl: Duration,
}

impl TokenCodec {
    /// Build a codec. Fails on a TTL outside `1..=MAX_TOKEN_TTL_SECS` so
    /// that a misconfigured process stops at startup instead of at issue time.
    pub fn new(secret: &SigningSecret, ttl: Duration) -> Result<Self, AuthError> {
        if ttl <= Duration::zero() {
            return Err(AuthError::Config(format!(
                "token TTL must be positive, got {}s",
                ttl.num_seconds()
            )));
        }
        if ttl.num_seconds() > MAX_TOKEN_TTL_SECS {
            return Err(AuthError::Config(format!(
                "token TTL must be at most {MAX_TOKEN_TTL_SECS}s, got {}s",
                ttl.num_seconds()
            )));
        }

        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            decoding_key: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
            validation: Arc::new(validation),
            ttl,
        })
    }

    /// Build a codec with the default 24h lifetime.
    pub fn with_default_ttl(secret: &SigningSecret) -> Result<Self, AuthError> {
        Self::new(secret, Duration::seconds(DEFAULT_TOKEN_TTL_SECS))
    }

    /// Lifetime of tokens issued by this codec.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `subject` valid from now until now + TTL.
    pub fn issue(&self, subject: &str, role: Role) -> Result<String, TokenError> {
        self.issue_at(subject, role, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_at(
        &self,
        subject: &str,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        if subject.is_empty() {
            return Err(TokenError::Encoding("subject is empty".into()));
        }
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| TokenError::Encoding("expiry out of range".into()))?;
        let claims = TokenClaims {
            sub: subject.to_string(),
            role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        encode(&Header::new(ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(format!("jwt encode: {e}")))
    }

    /// Verify the signature and expiry of `token` and recover its identity.
    pub fn parse(&self, token: &str) -> Result<Identity, TokenError> {
        let data =
            decode::<TokenClaims>(token, &self.decoding_key, &self.validation).map_err(classify)?;
        identity_from_claims(data.claims)
    }
}

/// Token lifetime from a configured number of seconds.
pub fn ttl_from_secs(secs: i64) -> Result<Duration, AuthError> {
    Duration::try_seconds(secs)
        .ok_or_else(|| AuthError::Config(format!("token TTL out of range: {secs}s")))
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &ALGORITHM)
            .field("ttl_secs", &self.ttl.num_seconds())
            .finish()
    }
}

fn classify(e: jsonwebtoken::errors::Error) -> TokenError {
    match e.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        // A header naming another algorithm cannot be verified under our key.
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::Signature,
        _ => TokenError::Malformed(e.to_string()),
    }
}

fn identity_from_claims(claims: TokenClaims) -> Result<Identity, TokenError> {
    if claims.sub.is_empty() {
        return Err(TokenError::Malformed("empty subject".into()));
    }
    let issued_at = DateTime::from_timestamp(claims.iat, 0)
        .ok_or_else(|| TokenError::Malformed("iat out of range".into()))?;
    let expires_at = DateTime::from_timestamp(claims.exp, 0)
        .ok_or_else(|| TokenError::Malformed("exp out of range".into()))?;
    Ok(Identity::new(claims.sub, claims.role, issued_at, expires_at))
}

/// Resolve the JWT secret: env var `JWT_SECRET` → `AUTH_SECRET` → persisted file.
pub fn resolve_jwt_secret() -> String {
    let from_env = ["JWT_SECRET", "AUTH_SECRET"]
        .iter()
        .find_map(|name| std::env::var(name).ok().filter(|s| !s.is_empty()));
    resolve_jwt_secret_from(from_env, &jwt_secret_path())
}

/// Resolve the secret from an explicit value or the file at `secret_path`,
/// generating and persisting a fresh one when neither exists.
pub fn resolve_jwt_secret_from(from_env: Option<String>, secret_path: &Path) -> String {
    if let Some(secret) = from_env {
        return secret;
    }
    if let Ok(existing) = std::fs::read_to_string(secret_path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    if let Some(parent) = secret_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    match std::fs::write(secret_path, &secret) {
        Ok(()) => info!(path = %secret_path.display(), "generated new JWT secret"),
        Err(e) => warn!(path = %secret_path.display(), error = %e, "could not persist JWT secret"),
    }
    secret
}

/// Path to the persisted JWT secret file.
fn jwt_secret_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fleet")
        .join("jwt-secret")
}
