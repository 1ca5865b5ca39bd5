//! Admin page logic: first-user creation, login, logout and the user list.
//!
//! The controller knows nothing about HTTP. Each operation takes the request's
//! session and form fields and returns an [`Outcome`]: either a view to render
//! or a location to redirect to. Validation failures are queued as flash
//! errors and shown on the next render.

use super::csrf::{ADMIN_TOKEN_NAMESPACE, TokenService};
use super::filters::FormData;
use super::password;
use super::{DASHBOARD_PATH, LOGIN_PATH, admin_url};
use crate::session::{FLASH_ERROR, LOGGED_IN_KEY, Session};
use crate::users::{CredentialStore, User, UserRecord};

pub const MISSING_CREDENTIALS: &str = "Both an email address and password are required";
pub const UNKNOWN_USER: &str = "No user exists for this email address";
pub const NO_PASSWORD_SET: &str = "This user has no password set";
pub const INVALID_PASSWORD: &str = "Invalid password";
const HASH_FAILED: &str = "Failed to process password";
const SAVE_FAILED: &str = "Failed to save the new user";

/// Session key remembering who logged in.
pub const USER_EMAIL_KEY: &str = "user_email";

/// Data every admin page receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContext {
    pub base_url: String,
    pub logged_in: bool,
    pub blog_path: Option<String>,
    pub current_uri: String,
    /// Fresh CSRF token for forms on the page
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminView {
    CreateUser {
        page: PageContext,
        errors: Vec<String>,
    },
    CreatedUser {
        page: PageContext,
        user: User,
        /// Whether the user was written to the credential store
        saved: bool,
    },
    Login {
        page: PageContext,
        errors: Vec<String>,
    },
    Users {
        page: PageContext,
        users: Vec<UserRecord>,
    },
    Dashboard {
        page: PageContext,
        email: Option<String>,
        user_count: usize,
    },
}

impl AdminView {
    pub fn page(&self) -> &PageContext {
        match self {
            AdminView::CreateUser { page, .. }
            | AdminView::CreatedUser { page, .. }
            | AdminView::Login { page, .. }
            | AdminView::Users { page, .. }
            | AdminView::Dashboard { page, .. } => page,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Render(AdminView),
    Redirect(String),
}

/// Shared collaborators for one request.
pub struct AuthController<'a> {
    pub users: &'a CredentialStore,
    pub tokens: &'a TokenService,
    pub base_url: &'a str,
    pub blog_path: Option<&'a str>,
    pub current_uri: &'a str,
}

impl AuthController<'_> {
    fn page(&self, session: &mut Session) -> PageContext {
        PageContext {
            base_url: self.base_url.to_string(),
            logged_in: session.logged_in(),
            blog_path: self.blog_path.map(str::to_string),
            current_uri: self.current_uri.to_string(),
            token: self.tokens.generate(session, ADMIN_TOKEN_NAMESPACE),
        }
    }

    /// GET /admin/create-user
    pub fn render_create_user(&self, session: &mut Session) -> Outcome {
        let page = self.page(session);
        let errors = session.flash_take(FLASH_ERROR);
        Outcome::Render(AdminView::CreateUser { page, errors })
    }

    /// POST /admin/create-user
    ///
    /// The new user is only written to the store while no users exist yet.
    /// After that the record is displayed so it can be added to the users file
    /// by hand.
    pub fn submit_create_user(&self, session: &mut Session, form: &FormData) -> Outcome {
        let email = field(form, "email");
        let password = field(form, "password");

        if email.is_empty() || password.is_empty() {
            session.flash_add(FLASH_ERROR, MISSING_CREDENTIALS);
            return self.render_create_user(session);
        }

        let password_hash = match password::hash_password(password) {
            Ok(hash) => hash,
            Err(e) => {
                tracing::error!("{}", e);
                session.flash_add(FLASH_ERROR, HASH_FAILED);
                return self.render_create_user(session);
            }
        };
        let user = User {
            email: email.to_string(),
            password_hash,
        };

        let saved = match self.users.persist_first_user(user.clone()) {
            Ok(saved) => {
                if saved {
                    tracing::info!("Created first admin user {}", user.email);
                }
                saved
            }
            Err(e) => {
                tracing::error!("Failed to persist admin user {}: {}", user.email, e);
                session.flash_add(FLASH_ERROR, SAVE_FAILED);
                return self.render_create_user(session);
            }
        };

        let page = self.page(session);
        Outcome::Render(AdminView::CreatedUser { page, user, saved })
    }

    /// GET /admin/login
    pub fn render_login(&self, session: &mut Session) -> Outcome {
        let page = self.page(session);
        let errors = session.flash_take(FLASH_ERROR);
        Outcome::Render(AdminView::Login { page, errors })
    }

    /// POST /admin/login
    ///
    /// Checks run in order and stop at the first failure, so only one error is
    /// ever reported.
    pub fn submit_login(&self, session: &mut Session, form: &FormData) -> Outcome {
        let email = field(form, "email");
        let password = field(form, "password");

        if let Err(message) = self.check_credentials(email, password) {
            tracing::info!(email, reason = message, "Admin login failed");
            session.flash_add(FLASH_ERROR, message);
            return Outcome::Redirect(admin_url(self.base_url, LOGIN_PATH));
        }

        session.set(LOGGED_IN_KEY, true);
        session.set(USER_EMAIL_KEY, email);
        tracing::info!(email, "Admin logged in");

        Outcome::Redirect(admin_url(self.base_url, DASHBOARD_PATH))
    }

    fn check_credentials(&self, email: &str, password: &str) -> Result<(), &'static str> {
        if email.is_empty() || password.is_empty() {
            return Err(MISSING_CREDENTIALS);
        }
        let user = self.users.find(email).ok_or(UNKNOWN_USER)?;
        let hash = user.password_hash.as_deref().ok_or(NO_PASSWORD_SET)?;
        if !password::verify_password(password, hash) {
            return Err(INVALID_PASSWORD);
        }
        Ok(())
    }

    /// GET /admin/logout
    pub fn logout(&self, session: &mut Session) -> Outcome {
        session.clear();
        tracing::info!("Admin logged out");
        Outcome::Redirect(admin_url(self.base_url, LOGIN_PATH))
    }

    /// GET /admin/users
    pub fn list_users(&self, session: &mut Session) -> Outcome {
        let page = self.page(session);
        Outcome::Render(AdminView::Users {
            page,
            users: self.users.list(),
        })
    }

    /// GET /admin
    pub fn dashboard(&self, session: &mut Session) -> Outcome {
        let page = self.page(session);
        let email = session
            .get(USER_EMAIL_KEY)
            .and_then(|v| v.as_str())
            .map(str::to_string);
        Outcome::Render(AdminView::Dashboard {
            page,
            email,
            user_count: self.users.len(),
        })
    }
}

fn field<'f>(form: &'f FormData, name: &str) -> &'f str {
    form.get(name).map(String::as_str).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMAIL: &str = "admin@example.com";
    const PASSWORD: &str = "correct horse";

    fn store_with_admin() -> CredentialStore {
        CredentialStore::in_memory([
            UserRecord {
                email: EMAIL.to_string(),
                password_hash: Some(password::hash_password(PASSWORD).unwrap()),
            },
            UserRecord {
                email: "nopass@example.com".to_string(),
                password_hash: None,
            },
        ])
    }

    fn controller<'a>(users: &'a CredentialStore, tokens: &'a TokenService) -> AuthController<'a> {
        AuthController {
            users,
            tokens,
            base_url: "http://site",
            blog_path: Some("blog"),
            current_uri: "/admin/login",
        }
    }

    fn form(email: &str, password: &str) -> FormData {
        [
            ("email".to_string(), email.to_string()),
            ("password".to_string(), password.to_string()),
        ]
        .into_iter()
        .collect()
    }

    fn login_errors(ctl: &AuthController<'_>, session: &mut Session) -> Vec<String> {
        match ctl.render_login(session) {
            Outcome::Render(AdminView::Login { errors, .. }) => errors,
            other => panic!("expected login view, got {other:?}"),
        }
    }

    #[test]
    fn test_login_success() {
        let users = store_with_admin();
        let tokens = TokenService::default();
        let ctl = controller(&users, &tokens);
        let mut session = Session::new();

        let outcome = ctl.submit_login(&mut session, &form(EMAIL, PASSWORD));

        assert_eq!(outcome, Outcome::Redirect("http://site/admin".to_string()));
        assert!(session.logged_in());
        assert!(!session.flash_has(FLASH_ERROR));
    }

    #[test]
    fn test_login_missing_fields() {
        let users = store_with_admin();
        let tokens = TokenService::default();
        let ctl = controller(&users, &tokens);
        let mut session = Session::new();

        let outcome = ctl.submit_login(&mut session, &form("", ""));

        assert_eq!(outcome, Outcome::Redirect("http://site/admin/login".to_string()));
        assert!(!session.contains(LOGGED_IN_KEY));
        assert_eq!(session.flash_peek(FLASH_ERROR), [MISSING_CREDENTIALS]);
    }

    #[test]
    fn test_login_missing_password_only() {
        let users = store_with_admin();
        let tokens = TokenService::default();
        let ctl = controller(&users, &tokens);
        let mut session = Session::new();

        ctl.submit_login(&mut session, &form(EMAIL, ""));
        assert_eq!(session.flash_peek(FLASH_ERROR), [MISSING_CREDENTIALS]);
    }

    #[test]
    fn test_login_absent_fields() {
        let users = store_with_admin();
        let tokens = TokenService::default();
        let ctl = controller(&users, &tokens);
        let mut session = Session::new();

        ctl.submit_login(&mut session, &FormData::new());
        assert_eq!(session.flash_peek(FLASH_ERROR), [MISSING_CREDENTIALS]);
    }

    #[test]
    fn test_login_unknown_email() {
        let users = store_with_admin();
        let tokens = TokenService::default();
        let ctl = controller(&users, &tokens);
        let mut session = Session::new();

        ctl.submit_login(&mut session, &form("ghost@x.com", "pw"));
        assert_eq!(session.flash_peek(FLASH_ERROR), [UNKNOWN_USER]);
        assert!(!session.logged_in());
    }

    #[test]
    fn test_login_empty_store() {
        let users = CredentialStore::in_memory([]);
        let tokens = TokenService::default();
        let ctl = controller(&users, &tokens);
        let mut session = Session::new();

        ctl.submit_login(&mut session, &form("ghost@x.com", "pw"));
        assert_eq!(session.flash_peek(FLASH_ERROR), [UNKNOWN_USER]);
    }

    #[test]
    fn test_login_user_without_password() {
        let users = store_with_admin();
        let tokens = TokenService::default();
        let ctl = controller(&users, &tokens);
        let mut session = Session::new();

        ctl.submit_login(&mut session, &form("nopass@example.com", "pw"));
        assert_eq!(session.flash_peek(FLASH_ERROR), [NO_PASSWORD_SET]);
    }

    #[test]
    fn test_login_wrong_password() {
        let users = store_with_admin();
        let tokens = TokenService::default();
        let ctl = controller(&users, &tokens);
        let mut session = Session::new();

        let outcome = ctl.submit_login(&mut session, &form(EMAIL, "wrong"));

        assert_eq!(outcome, Outcome::Redirect("http://site/admin/login".to_string()));
        assert_eq!(session.flash_peek(FLASH_ERROR), [INVALID_PASSWORD]);
        assert!(!session.contains(LOGGED_IN_KEY));
    }

    #[test]
    fn test_login_error_shown_once() {
        let users = store_with_admin();
        let tokens = TokenService::default();
        let ctl = controller(&users, &tokens);
        let mut session = Session::new();

        ctl.submit_login(&mut session, &form(EMAIL, "wrong"));
        assert_eq!(login_errors(&ctl, &mut session), vec![INVALID_PASSWORD]);
        assert!(login_errors(&ctl, &mut session).is_empty());
    }

    #[test]
    fn test_render_carries_page_context() {
        let users = store_with_admin();
        let tokens = TokenService::default();
        let ctl = controller(&users, &tokens);
        let mut session = Session::new();

        let Outcome::Render(view) = ctl.render_login(&mut session) else {
            panic!("expected a render");
        };
        let page = view.page();
        assert_eq!(page.base_url, "http://site");
        assert_eq!(page.blog_path.as_deref(), Some("blog"));
        assert_eq!(page.current_uri, "/admin/login");
        assert!(!page.logged_in);
        assert!(
            tokens
                .check(&mut session, ADMIN_TOKEN_NAMESPACE, &page.token)
                .is_ok()
        );
    }

    #[test]
    fn test_logout_clears_session() {
        let users = store_with_admin();
        let tokens = TokenService::default();
        let ctl = controller(&users, &tokens);
        let mut session = Session::new();

        ctl.submit_login(&mut session, &form(EMAIL, PASSWORD));
        session.set("extra", "value");
        assert!(session.logged_in());

        let outcome = ctl.logout(&mut session);

        assert_eq!(outcome, Outcome::Redirect("http://site/admin/login".to_string()));
        assert!(session.is_empty());
        assert!(!session.contains(LOGGED_IN_KEY));
        assert!(!session.contains("extra"));
    }

    #[test]
    fn test_create_user_requires_both_fields() {
        let users = CredentialStore::in_memory([]);
        let tokens = TokenService::default();
        let ctl = controller(&users, &tokens);
        let mut session = Session::new();

        let outcome = ctl.submit_create_user(&mut session, &form("a@b.c", ""));

        match outcome {
            Outcome::Render(AdminView::CreateUser { errors, .. }) => {
                assert_eq!(errors, vec![MISSING_CREDENTIALS]);
            }
            other => panic!("expected create-user view, got {other:?}"),
        }
        assert!(users.is_empty());
        assert!(!session.flash_has(FLASH_ERROR));
    }

    #[test]
    fn test_create_first_user_persists() {
        let users = CredentialStore::in_memory([]);
        let tokens = TokenService::default();
        let ctl = controller(&users, &tokens);
        let mut session = Session::new();

        let outcome = ctl.submit_create_user(&mut session, &form("first@x.com", "secret"));

        let Outcome::Render(AdminView::CreatedUser { user, saved, .. }) = outcome else {
            panic!("expected created-user view");
        };
        assert!(saved);
        assert_eq!(user.email, "first@x.com");
        assert!(password::verify_password("secret", &user.password_hash));
        assert!(!password::verify_password("other", &user.password_hash));

        let stored = users.find("first@x.com").unwrap();
        assert_eq!(stored.password_hash.as_deref(), Some(user.password_hash.as_str()));
    }

    #[test]
    fn test_create_user_with_existing_users_is_display_only() {
        let users = store_with_admin();
        let tokens = TokenService::default();
        let ctl = controller(&users, &tokens);
        let mut session = Session::new();

        let outcome = ctl.submit_create_user(&mut session, &form("second@x.com", "secret"));

        let Outcome::Render(AdminView::CreatedUser { saved, .. }) = outcome else {
            panic!("expected created-user view");
        };
        assert!(!saved);
        assert!(users.find("second@x.com").is_none());
        assert_eq!(users.len(), 2);
    }

    #[test]
    fn test_list_users() {
        let users = store_with_admin();
        let tokens = TokenService::default();
        let ctl = controller(&users, &tokens);
        let mut session = Session::new();

        let Outcome::Render(AdminView::Users { users: listed, .. }) = ctl.list_users(&mut session)
        else {
            panic!("expected users view");
        };
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].email, EMAIL);
    }

    #[test]
    fn test_dashboard_shows_logged_in_email() {
        let users = store_with_admin();
        let tokens = TokenService::default();
        let ctl = controller(&users, &tokens);
        let mut session = Session::new();

        ctl.submit_login(&mut session, &form(EMAIL, PASSWORD));
        let Outcome::Render(AdminView::Dashboard { page, email, user_count }) =
            ctl.dashboard(&mut session)
        else {
            panic!("expected dashboard view");
        };
        assert!(page.logged_in);
        assert_eq!(email.as_deref(), Some(EMAIL));
        assert_eq!(user_count, 2);
    }
}
