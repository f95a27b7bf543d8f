//! Business logic shared by handlers and the server binary.

pub mod auth;
pub mod users;
