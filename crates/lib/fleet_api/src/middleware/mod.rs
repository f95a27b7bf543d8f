//! Request middleware: the authentication gate and per-route policy guards.

pub mod auth;
pub mod policy;
