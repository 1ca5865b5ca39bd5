//! Web administration UI: axum routes and askama views over the auth core.

pub mod routes;
pub mod templates;

pub use routes::{SESSION_COOKIE_NAME, admin_router};
