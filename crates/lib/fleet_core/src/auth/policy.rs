// @zen-component: AUTH-AccessDecisionEngine
//
//! Access decisions for protected operations.
//!
//! Each operation carries a [`Policy`]. Given the caller's identity (if any)
//! and the key of the resource owner, [`AccessDecisionEngine::decide`]
//! answers Allow or Deny. The only I/O is the injected [`OwnerLookup`],
//! consulted when a numeric owner id must be resolved to a username.
//!
//! The admin and self checks run before the owner's existence is known:
//! an unresolvable owner is a Deny, never a "not found", so callers cannot
//! enumerate ids they are not allowed to touch.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::models::auth::Identity;
use crate::store::StoreError;

/// Default upper bound on a single owner lookup.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);

/// Declarative access rule attached to an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Only callers with the ADMIN role.
    AdminOnly,
    /// ADMIN callers, or the caller who owns the resource.
    SelfOrAdmin,
    /// Anyone, authenticated or not.
    Public,
}

/// Identifies the owner a `SelfOrAdmin` check compares the caller against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerKey {
    Username(String),
    UserId(i64),
}

/// How a route names its resource owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerKeyKind {
    Username,
    UserId,
}

impl OwnerKeyKind {
    /// Read `raw` as this kind of key. `None` when it does not fit, which a
    /// `SelfOrAdmin` decision treats as an unknown owner.
    pub fn parse(self, raw: &str) -> Option<OwnerKey> {
        match self {
            OwnerKeyKind::UserId => raw.parse::<i64>().ok().map(OwnerKey::UserId),
            OwnerKeyKind::Username if raw.is_empty() => None,
            OwnerKeyKind::Username => Some(OwnerKey::Username(raw.to_string())),
        }
    }
}

/// Why a request was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    AdminRequired,
    NotAuthorized,
}

impl DenyReason {
    pub fn message(&self) -> &'static str {
        match self {
            DenyReason::AdminRequired => "Admin access required",
            DenyReason::NotAuthorized => "Not authorized",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Outcome of an access decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Resolves a numeric user id to the owning username.
#[async_trait]
pub trait OwnerLookup: Send + Sync {
    async fn username_for_id(&self, id: i64) -> Result<Option<String>, StoreError>;
}

/// Evaluates policies against callers.
#[derive(Clone)]
pub struct AccessDecisionEngine {
    lookup: Arc<dyn OwnerLookup>,
    lookup_timeout: Duration,
}

impl AccessDecisionEngine {
    pub fn new(lookup: Arc<dyn OwnerLookup>, lookup_timeout: Duration) -> Self {
        Self {
            lookup,
            lookup_timeout,
        }
    }

    pub async fn decide(
        &self,
        policy: Policy,
        caller: Option<&Identity>,
        owner: Option<&OwnerKey>,
    ) -> Decision {
        let decision = match policy {
            Policy::Public => Decision::Allow,
            Policy::AdminOnly => match caller {
                Some(identity) if identity.is_admin() => Decision::Allow,
                _ => Decision::Deny(DenyReason::AdminRequired),
            },
            Policy::SelfOrAdmin => self.decide_self_or_admin(caller, owner).await,
        };
        if let Decision::Deny(reason) = decision {
            debug!(
                ?policy,
                caller = caller.map(|c| c.subject()),
                ?owner,
                %reason,
                "access denied"
            );
        }
        decision
    }

    async fn decide_self_or_admin(
        &self,
        caller: Option<&Identity>,
        owner: Option<&OwnerKey>,
    ) -> Decision {
        let Some(identity) = caller else {
            return Decision::Deny(DenyReason::NotAuthorized);
        };
        if identity.is_admin() {
            return Decision::Allow;
        }
        let Some(owner) = owner else {
            return Decision::Deny(DenyReason::NotAuthorized);
        };
        match self.resolve_owner(owner).await {
            Some(username) if username == identity.subject() => Decision::Allow,
            _ => Decision::Deny(DenyReason::NotAuthorized),
        }
    }

    /// Username behind `owner`, or `None` when it cannot be resolved.
    async fn resolve_owner(&self, owner: &OwnerKey) -> Option<String> {
        let id = match owner {
            OwnerKey::Username(name) => return Some(name.clone()),
            OwnerKey::UserId(id) => *id,
        };
        match tokio::time::timeout(self.lookup_timeout, self.lookup.username_for_id(id)).await {
            Ok(Ok(username)) => username,
            Ok(Err(e)) => {
                warn!(user_id = id, error = %e, "owner lookup failed");
                None
            }
            Err(_) => {
                warn!(user_id = id, timeout = ?self.lookup_timeout, "owner lookup timed out");
                None
            }
        }
    }
}

impl fmt::Debug for AccessDecisionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessDecisionEngine")
            .field("lookup_timeout", &self.lookup_timeout)
            .finish()
    }
}
