use crate::{Error, Result};

pub fn hash(password: &str) -> Result<String> {
    if password.is_empty() {
        return Err(Error::Custom("password must not be empty".into()));
    }
    Ok(fleet_core::auth::password::hash_password(password)?)
}
