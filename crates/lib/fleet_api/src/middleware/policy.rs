//! Per-route access policy enforcement.
//!
//! A [`PolicyGuard`] is attached to a method router with `route_layer`, so it
//! only runs for matched routes and always after the authentication gate.

use axum::{
    extract::{RawPathParams, Request, State, rejection::RawPathParamsRejection},
    middleware::Next,
    response::Response,
};
use fleet_core::auth::{AccessDecisionEngine, Decision, OwnerKey, OwnerKeyKind, Policy};

use super::auth::AuthenticatedUser;
use crate::error::AppError;

/// Policy attached to one operation, plus where to find the resource owner.
#[derive(Clone)]
pub struct PolicyGuard {
    engine: AccessDecisionEngine,
    policy: Policy,
    owner_param: Option<(&'static str, OwnerKeyKind)>,
}

impl PolicyGuard {
    pub fn new(engine: AccessDecisionEngine, policy: Policy) -> Self {
        Self {
            engine,
            policy,
            owner_param: None,
        }
    }

    /// Path parameter naming the resource owner, read as `kind`.
    pub fn owner_param(mut self, name: &'static str, kind: OwnerKeyKind) -> Self {
        self.owner_param = Some((name, kind));
        self
    }

    fn owner_key(&self, params: &RawPathParams) -> Option<OwnerKey> {
        let (name, kind) = self.owner_param?;
        params
            .iter()
            .find(|(key, _)| *key == name)
            .and_then(|(_, value)| kind.parse(value))
    }
}

/// Axum middleware: evaluates the guard's policy and answers a plain-text
/// 403 on Deny without invoking the handler.
pub async fn enforce_policy(
    State(guard): State<PolicyGuard>,
    params: Result<RawPathParams, RawPathParamsRejection>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let caller = request
        .extensions()
        .get::<AuthenticatedUser>()
        .map(|user| user.0.clone());
    // Unreadable or mistyped params leave the owner unknown, which SelfOrAdmin denies.
    let owner = params.ok().and_then(|params| guard.owner_key(&params));

    match guard
        .engine
        .decide(guard.policy, caller.as_ref(), owner.as_ref())
        .await
    {
        Decision::Allow => Ok(next.run(request).await),
        Decision::Deny(reason) => Err(AppError::Forbidden(reason)),
    }
}
