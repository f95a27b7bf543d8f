use fleet_core::auth::jwt::{DEFAULT_TOKEN_TTL_SECS, resolve_jwt_secret, ttl_from_secs};
use fleet_core::auth::{SigningSecret, TokenCodec, TokenVerifier};
use fleet_core::models::auth::{Identity, Role};
use serde_json::{Value, json};

use crate::{Error, Result};

/// Codec over the given secret, or the persisted server secret.
pub fn codec(secret: Option<&str>, ttl_secs: Option<i64>) -> Result<TokenCodec> {
    let raw = match secret {
        Some(s) => s.to_string(),
        None => {
            log::debug!("no --secret given, using the persisted server secret");
            resolve_jwt_secret()
        }
    };
    let secret = SigningSecret::parse(&raw)?;
    let ttl = ttl_from_secs(ttl_secs.unwrap_or(DEFAULT_TOKEN_TTL_SECS))?;
    Ok(TokenCodec::new(&secret, ttl)?)
}

pub fn issue(codec: &TokenCodec, subject: &str, role: &str) -> Result<String> {
    let role: Role = role.parse().map_err(|e| Error::Custom(format!("{e}")))?;
    let token = codec.issue(subject, role)?;
    log::debug!("issued {role} token for {subject}");
    Ok(token)
}

/// JSON summary of `token`. Anything that fails verification reports
/// `valid: false` and `expired: true` with no claims.
pub fn inspect(codec: TokenCodec, token: &str) -> Result<String> {
    let identity = TokenVerifier::new(codec).identity(token);
    Ok(serde_json::to_string_pretty(&summarize(identity.as_ref()))?)
}

// A decoded identity has already passed the expiry check with no leeway.
fn summarize(identity: Option<&Identity>) -> Value {
    json!({
        "valid": identity.is_some(),
        "subject": identity.map(|i| i.subject()),
        "role": identity.map(|i| i.role()),
        "expired": identity.is_none(),
        "expiresAt": identity.map(|i| i.expires_at().to_rfc3339()),
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    const SECRET: &str = "cli-unit-test-secret-long-enough-for-hs512";

    fn test_codec() -> TokenCodec {
        codec(Some(SECRET), None).unwrap()
    }

    #[test]
    fn valid_token_summary_is_unexpired() {
        let token = issue(&test_codec(), "alice", "USER").unwrap();
        let json: Value = serde_json::from_str(&inspect(test_codec(), &token).unwrap()).unwrap();
        assert_eq!(json["valid"], true);
        assert_eq!(json["expired"], false);
        assert_eq!(json["subject"], "alice");
    }

    #[test]
    fn rejected_token_summary_is_expired_without_claims() {
        let json = summarize(None);
        assert_eq!(json["valid"], false);
        assert_eq!(json["expired"], true);
        assert!(json["subject"].is_null());
        assert!(json["expiresAt"].is_null());
    }

    #[test]
    fn expired_token_is_reported_from_a_single_decode() {
        let short = codec(Some(SECRET), Some(60)).unwrap();
        let token = short
            .issue_at("alice", Role::User, Utc::now() - Duration::hours(1))
            .unwrap();
        let json: Value = serde_json::from_str(&inspect(test_codec(), &token).unwrap()).unwrap();
        assert_eq!(json["valid"], false);
        assert_eq!(json["expired"], true);
    }
}
