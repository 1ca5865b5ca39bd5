//! Admin authentication: CSRF tokens, route filters, password hashing and the
//! login/logout controller.

pub mod controller;
pub mod csrf;
pub mod filters;
pub mod password;

pub use controller::{AdminView, AuthController, Outcome, PageContext};
pub use csrf::{ADMIN_TOKEN_NAMESPACE, TokenService};
pub use filters::{Filter, FilterChain, FilterContext, FilterOutcome, FormData, RouteGroup};

pub const DASHBOARD_PATH: &str = "/admin";
pub const CREATE_USER_PATH: &str = "/admin/create-user";
pub const LOGIN_PATH: &str = "/admin/login";
pub const LOGOUT_PATH: &str = "/admin/logout";
pub const USERS_PATH: &str = "/admin/users";

/// Absolute admin URL for redirects.
pub fn admin_url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}
