//! Application state shared by all admin handlers.

use chrono::Duration;
use std::sync::Arc;

use crate::auth::{AuthController, TokenService};
use crate::config::Config;
use crate::session::SessionStore;
use crate::users::CredentialStore;

/// Application state passed to all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    /// Configured admin users
    pub users: Arc<CredentialStore>,

    /// Browser sessions keyed by cookie
    pub sessions: SessionStore,

    pub tokens: TokenService,
}

impl AppState {
    pub fn new(config: Config, users: CredentialStore) -> Self {
        let tokens = TokenService::new(config.csrf_token_max_age_secs.map(Duration::seconds));
        let sessions = SessionStore::new(config.session_expiry_hours);
        Self {
            config: Arc::new(config),
            users: Arc::new(users),
            sessions,
            tokens,
        }
    }

    /// Controller bound to this state for a request to `current_uri`.
    pub fn controller<'a>(&'a self, current_uri: &'a str) -> AuthController<'a> {
        AuthController {
            users: &self.users,
            tokens: &self.tokens,
            base_url: &self.config.base_url,
            blog_path: self.config.blog_path.as_deref(),
            current_uri,
        }
    }
}
