//! Version 1 API routes, mounted under the configured API prefix.

pub mod auth;
pub mod users;

use super::RouteRegistry;

pub fn register(registry: RouteRegistry) -> RouteRegistry {
    registry
        .group("/auth", auth::register)
        .group("/users", users::register)
}
