use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{}", .0)]
    Custom(String),

    #[error("Auth::{:?}: {}", .0, .0)]
    Auth(#[from] fleet_core::auth::AuthError),

    #[error("Token::{:?}: {}", .0, .0)]
    Token(#[from] fleet_core::auth::TokenError),

    #[error("Json::{:?}: {}", .0, .0)]
    Json(#[from] serde_json::Error),

    #[error("FlexiLogger::{:?}: {}", .0, .0)]
    FlexiLogger(#[from] flexi_logger::FlexiLoggerError),
}
