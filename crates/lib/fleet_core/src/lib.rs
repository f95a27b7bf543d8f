//! # fleet_core
//!
//! Core domain logic for Fleet: token issuance and verification, access
//! decisions, and the storage collaborators the HTTP layer sits on.

pub mod auth;
pub mod models;
pub mod store;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
