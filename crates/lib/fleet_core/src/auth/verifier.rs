// @zen-component: AUTH-TokenVerifier
//
//! Fail-closed wrapper around [`TokenCodec`].
//!
//! Every query collapses decode, signature and expiry failures into a
//! negative answer, so callers never have to match on error kinds to stay
//! safe. Failures are logged with their category.

use tracing::warn;

use super::TokenError;
use super::jwt::TokenCodec;
use crate::models::auth::{Identity, Role};

/// Boolean and derived queries over tokens.
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    codec: TokenCodec,
}

impl TokenVerifier {
    pub fn new(codec: TokenCodec) -> Self {
        Self { codec }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Decoded identity of a valid token, `None` for anything else.
    pub fn identity(&self, token: &str) -> Option<Identity> {
        if token.is_empty() {
            warn!("token is empty");
            return None;
        }
        match self.codec.parse(token) {
            Ok(identity) => Some(identity),
            Err(e) => {
                match &e {
                    TokenError::Signature => warn!("invalid JWT signature"),
                    TokenError::Expired => warn!("JWT token is expired"),
                    TokenError::Malformed(detail) => warn!(%detail, "invalid JWT token"),
                    TokenError::Encoding(detail) => warn!(%detail, "unexpected JWT error"),
                }
                None
            }
        }
    }

    /// True only for a well-formed, correctly signed, unexpired token.
    pub fn validate(&self, token: &str) -> bool {
        self.identity(token).is_some()
    }

    pub fn extract_subject(&self, token: &str) -> Option<String> {
        self.identity(token).map(|identity| identity.subject().to_string())
    }

    pub fn extract_role(&self, token: &str) -> Option<Role> {
        self.identity(token).map(|identity| identity.role())
    }

    /// True when the token is past expiry or cannot be verified at all.
    pub fn is_expired(&self, token: &str) -> bool {
        match self.identity(token) {
            Some(identity) => identity.expires_at() < chrono::Utc::now(),
            None => true,
        }
    }

    /// True when the token is valid and was issued to `username`.
    pub fn is_token_valid_for(&self, token: &str, username: &str) -> bool {
        match self.identity(token) {
            Some(identity) => identity.subject() == username,
            None => {
                warn!(username, "token rejected for user");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::auth::jwt::SigningSecret;

    fn verifier() -> TokenVerifier {
        let secret = SigningSecret::parse("verifier-test-secret-0123456789abcdef").unwrap();
        TokenVerifier::new(TokenCodec::new(&secret, Duration::days(1)).unwrap())
    }

    fn flip_signature_char(token: &str) -> String {
        let sig_start = token.rfind('.').unwrap() + 1;
        let mut chars: Vec<char> = token.chars().collect();
        chars[sig_start] = if chars[sig_start] == 'x' { 'y' } else { 'x' };
        chars.into_iter().collect()
    }

    #[test]
    fn fresh_admin_token_is_valid() {
        let verifier = verifier();
        let token = verifier.codec().issue("admin", Role::Admin).unwrap();
        assert!(verifier.validate(&token));
        assert_eq!(verifier.extract_subject(&token).as_deref(), Some("admin"));
        assert_eq!(verifier.extract_role(&token).map(|r| r.as_str()), Some("ADMIN"));
        assert!(!verifier.is_expired(&token));
    }

    #[test]
    fn flipped_signature_fails_closed() {
        let verifier = verifier();
        let token = verifier.codec().issue("user1", Role::User).unwrap();
        let tampered = flip_signature_char(&token);
        assert!(!verifier.validate(&tampered));
        assert!(verifier.is_expired(&tampered));
        assert_eq!(verifier.extract_subject(&tampered), None);
        assert_eq!(verifier.extract_role(&tampered), None);
    }

    #[test]
    fn empty_and_garbage_fail_closed() {
        let verifier = verifier();
        for token in ["", "invalid.jwt.token", "Bearer"] {
            assert!(!verifier.validate(token));
            assert!(verifier.is_expired(token));
            assert_eq!(verifier.extract_subject(token), None);
            assert_eq!(verifier.extract_role(token), None);
        }
    }

    #[test]
    fn expired_token_fails_closed() {
        let verifier = verifier();
        let token = verifier
            .codec()
            .issue_at("user1", Role::User, Utc::now() - Duration::days(3))
            .unwrap();
        assert!(!verifier.validate(&token));
        assert!(verifier.is_expired(&token));
    }

    #[test]
    fn validate_is_repeatable() {
        let verifier = verifier();
        let token = verifier.codec().issue("user1", Role::User).unwrap();
        let tampered = flip_signature_char(&token);
        for _ in 0..3 {
            assert!(verifier.validate(&token));
            assert!(!verifier.validate(&tampered));
        }
    }

    #[test]
    fn token_is_valid_only_for_its_subject() {
        let verifier = verifier();
        let admin_token = verifier.codec().issue("admin", Role::Admin).unwrap();
        let user_token = verifier.codec().issue("user1", Role::User).unwrap();
        assert!(verifier.is_token_valid_for(&admin_token, "admin"));
        assert!(verifier.is_token_valid_for(&user_token, "user1"));
        assert!(!verifier.is_token_valid_for(&admin_token, "user1"));
        assert!(!verifier.is_token_valid_for(&user_token, "admin"));
    }
}
