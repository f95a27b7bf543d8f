//! Authentication and authorization logic.
//!
//! Provides the token codec, the fail-closed token verifier, the access
//! decision engine and password hashing shared by `fleet_api` and `fleet_cli`.

pub mod jwt;
pub mod password;
pub mod policy;
pub mod verifier;

use thiserror::Error;

use crate::store::StoreError;

pub use jwt::{SigningSecret, TokenCodec};
pub use policy::{
    AccessDecisionEngine, Decision, DenyReason, OwnerKey, OwnerKeyKind, OwnerLookup, Policy,
};
pub use verifier::TokenVerifier;

/// Reasons a token cannot be produced or accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Structurally invalid: wrong segment count, bad base64, bad claims JSON.
    #[error("Malformed token: {0}")]
    Malformed(String),

    /// The MAC over header and payload does not match.
    #[error("Invalid token signature")]
    Signature,

    #[error("Token has expired")]
    Expired,

    #[error("Token encoding failed: {0}")]
    Encoding(String),
}

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    Credentials,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}
