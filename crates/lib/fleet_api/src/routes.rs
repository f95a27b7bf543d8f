//! Route paths.

/// The only public route.
pub const POST_USERS_LOGIN: &str = "/api/users/login";

pub const USERS: &str = "/api/users";
pub const USERS_ID: &str = "/api/users/{id}";

pub const VEHICLES: &str = "/api/vehicles";
pub const VEHICLES_ID: &str = "/api/vehicles/{id}";
pub const VEHICLES_BY_USER: &str = "/api/vehicles/user/{userId}";
