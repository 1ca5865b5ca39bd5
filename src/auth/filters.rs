//! Before-filters guarding admin routes.
//!
//! Each route group declares an ordered list of [`Filter`]s. [`FilterChain::run`]
//! evaluates them in order and stops at the first one that denies; a denial
//! carries the redirect location. A CSRF failure is not a denial but an error
//! that aborts the request.

use std::collections::HashMap;
use std::fmt;

use super::csrf::{ADMIN_TOKEN_NAMESPACE, TOKEN_FIELD, TokenService};
use super::{CREATE_USER_PATH, LOGIN_PATH, admin_url};
use crate::error::InvalidTokenError;
use crate::session::Session;
use crate::users::CredentialStore;

/// Decoded `application/x-www-form-urlencoded` body.
pub type FormData = HashMap<String, String>;

/// Result of a single filter or a whole chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOutcome {
    Allow,
    Deny { location: String },
}

impl FilterOutcome {
    pub fn is_allow(&self) -> bool {
        matches!(self, FilterOutcome::Allow)
    }
}

/// Everything a filter may look at.
pub struct FilterContext<'a> {
    pub session: &'a mut Session,
    pub users: &'a CredentialStore,
    pub tokens: &'a TokenService,
    /// Request body, if the request carried one
    pub form: Option<&'a FormData>,
    pub base_url: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filter {
    /// Verify the form token on submissions
    Csrf,
    /// Require at least one configured user
    Users,
    /// Require a logged-in session
    Auth,
}

impl Filter {
    pub fn name(self) -> &'static str {
        match self {
            Filter::Csrf => "csrf",
            Filter::Users => "users",
            Filter::Auth => "auth",
        }
    }

    pub fn evaluate(self, ctx: &mut FilterContext<'_>) -> Result<FilterOutcome, InvalidTokenError> {
        match self {
            Filter::Csrf => {
                let Some(form) = ctx.form.filter(|form| !form.is_empty()) else {
                    return Ok(FilterOutcome::Allow);
                };
                let presented = form.get(TOKEN_FIELD).map(String::as_str).unwrap_or("");
                ctx.tokens
                    .check(ctx.session, ADMIN_TOKEN_NAMESPACE, presented)?;
                Ok(FilterOutcome::Allow)
            }
            Filter::Users => {
                if ctx.users.is_empty() {
                    tracing::debug!("No admin users configured, redirecting to create-user");
                    Ok(FilterOutcome::Deny {
                        location: admin_url(ctx.base_url, CREATE_USER_PATH),
                    })
                } else {
                    Ok(FilterOutcome::Allow)
                }
            }
            Filter::Auth => {
                if ctx.session.logged_in() {
                    Ok(FilterOutcome::Allow)
                } else {
                    Ok(FilterOutcome::Deny {
                        location: admin_url(ctx.base_url, LOGIN_PATH),
                    })
                }
            }
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A named, ordered set of filters shared by several routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteGroup {
    pub name: &'static str,
    pub filters: &'static [Filter],
}

/// `/admin/create-user`
pub const CREATE_USER_GROUP: RouteGroup = RouteGroup {
    name: "create-user",
    filters: &[Filter::Csrf],
};

/// `/admin/login`
pub const LOGIN_GROUP: RouteGroup = RouteGroup {
    name: "login",
    filters: &[Filter::Csrf, Filter::Users],
};

/// Everything behind a login
pub const PROTECTED_GROUP: RouteGroup = RouteGroup {
    name: "protected",
    filters: &[Filter::Csrf, Filter::Users, Filter::Auth],
};

pub struct FilterChain;

impl FilterChain {
    /// Run `group`'s filters in order, stopping at the first deny.
    pub fn run(
        group: &RouteGroup,
        ctx: &mut FilterContext<'_>,
    ) -> Result<FilterOutcome, InvalidTokenError> {
        for filter in group.filters {
            let outcome = filter.evaluate(ctx)?;
            if !outcome.is_allow() {
                tracing::debug!(group = group.name, filter = %filter, "Filter denied request");
                return Ok(outcome);
            }
        }
        Ok(FilterOutcome::Allow)
    }
}
