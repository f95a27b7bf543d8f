//! # fleet_api
//!
//! HTTP API library for Fleet.
//!
//! Every route except login sits behind the authentication gate
//! ([`middleware::auth::require_auth`]). Operations with an access policy are
//! additionally wrapped by [`middleware::policy::enforce_policy`], which runs
//! after the gate and before the handler.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post, put};
use fleet_core::auth::jwt::ttl_from_secs;
use fleet_core::auth::{
    AccessDecisionEngine, AuthError, OwnerKeyKind, Policy, SigningSecret, TokenCodec,
    TokenVerifier,
};
use fleet_core::store::{UserStore, VehicleStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::{auth, users, vehicles};
use crate::middleware::policy::{PolicyGuard, enforce_policy};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// API configuration.
    pub config: ApiConfig,
    pub users: Arc<dyn UserStore>,
    pub vehicles: Arc<dyn VehicleStore>,
    /// Token verification; also owns the codec used at login.
    pub verifier: TokenVerifier,
    pub access: AccessDecisionEngine,
}

impl AppState {
    /// Build state over `store`.
    ///
    /// Fails when the signing secret or TTL in `config` is unusable, so the
    /// server refuses to start instead of issuing unverifiable tokens.
    pub fn new<S>(config: ApiConfig, store: Arc<S>) -> Result<Self, AuthError>
    where
        S: UserStore + VehicleStore + 'static,
    {
        let secret = SigningSecret::parse(&config.jwt_secret)?;
        let codec = TokenCodec::new(&secret, ttl_from_secs(config.token_ttl_secs)?)?;
        Ok(Self {
            verifier: TokenVerifier::new(codec),
            access: AccessDecisionEngine::new(store.clone(), config.lookup_timeout),
            users: store.clone(),
            vehicles: store,
            config,
        })
    }

    pub fn codec(&self) -> &TokenCodec {
        self.verifier.codec()
    }
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let admin_only = from_fn_with_state(
        PolicyGuard::new(state.access.clone(), Policy::AdminOnly),
        enforce_policy,
    );
    let self_or_admin_by_id = from_fn_with_state(
        PolicyGuard::new(state.access.clone(), Policy::SelfOrAdmin)
            .owner_param("id", OwnerKeyKind::UserId),
        enforce_policy,
    );
    let self_or_admin_by_user_id = from_fn_with_state(
        PolicyGuard::new(state.access.clone(), Policy::SelfOrAdmin)
            .owner_param("userId", OwnerKeyKind::UserId),
        enforce_policy,
    );

    // Public routes (no auth required)
    let public = Router::new().route(routes::POST_USERS_LOGIN, post(auth::login_handler));

    // Protected routes (require auth)
    let protected = Router::new()
        .route(routes::USERS, get(users::list_users_handler))
        .route(
            routes::USERS,
            post(users::create_user_handler).route_layer(admin_only.clone()),
        )
        .route(routes::USERS_ID, get(users::get_user_handler))
        .route(
            routes::USERS_ID,
            put(users::update_user_handler)
                .delete(users::delete_user_handler)
                .route_layer(self_or_admin_by_id),
        )
        .route(routes::VEHICLES, get(vehicles::list_vehicles_handler))
        .route(
            routes::VEHICLES,
            post(vehicles::create_vehicle_handler).route_layer(admin_only.clone()),
        )
        .route(routes::VEHICLES_ID, get(vehicles::get_vehicle_handler))
        .route(
            routes::VEHICLES_ID,
            put(vehicles::update_vehicle_handler)
                .delete(vehicles::delete_vehicle_handler)
                .route_layer(admin_only),
        )
        .route(
            routes::VEHICLES_BY_USER,
            get(vehicles::list_vehicles_by_user_handler).route_layer(self_or_admin_by_user_id),
        )
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
