//! Admin route handlers.
//!
//! Every handler goes through [`dispatch`]: load the session from its cookie,
//! run the route group's filters, call the controller, store the session and
//! turn the outcome into a response.

use axum::{
    Form, Router,
    extract::{State, rejection::FormRejection},
    http::{StatusCode, Uri, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use super::templates;
use crate::auth::filters::{CREATE_USER_GROUP, LOGIN_GROUP, PROTECTED_GROUP};
use crate::auth::{
    AuthController, CREATE_USER_PATH, DASHBOARD_PATH, FilterChain, FilterContext, FilterOutcome,
    FormData, LOGIN_PATH, LOGOUT_PATH, Outcome, RouteGroup, USERS_PATH, admin_url,
};
use crate::session::{Session, generate_session_id};
use crate::state::AppState;

pub const SESSION_COOKIE_NAME: &str = "baun_admin_session";

/// Build the admin router.
pub fn admin_router(state: AppState) -> Router {
    Router::new()
        .route(DASHBOARD_PATH, get(dashboard))
        .route("/admin/", get(dashboard_slash))
        .route(
            CREATE_USER_PATH,
            get(create_user_page).post(create_user_submit),
        )
        .route(LOGIN_PATH, get(login_page).post(login_submit))
        .route(LOGOUT_PATH, get(logout))
        .route(USERS_PATH, get(users_page))
        .with_state(state)
}

/// GET /admin/create-user
async fn create_user_page(State(state): State<AppState>, jar: CookieJar, uri: Uri) -> Response {
    dispatch(&state, jar, &uri, None, &CREATE_USER_GROUP, |ctl, session| {
        ctl.render_create_user(session)
    })
}

/// POST /admin/create-user
async fn create_user_submit(
    State(state): State<AppState>,
    jar: CookieJar,
    uri: Uri,
    form: Result<Form<FormData>, FormRejection>,
) -> Response {
    let form = form_body(form);
    let empty = FormData::new();
    dispatch(&state, jar, &uri, form.as_ref(), &CREATE_USER_GROUP, |ctl, session| {
        ctl.submit_create_user(session, form.as_ref().unwrap_or(&empty))
    })
}

/// GET /admin/login
async fn login_page(State(state): State<AppState>, jar: CookieJar, uri: Uri) -> Response {
    dispatch(&state, jar, &uri, None, &LOGIN_GROUP, |ctl, session| {
        ctl.render_login(session)
    })
}

/// POST /admin/login
async fn login_submit(
    State(state): State<AppState>,
    jar: CookieJar,
    uri: Uri,
    form: Result<Form<FormData>, FormRejection>,
) -> Response {
    let form = form_body(form);
    let empty = FormData::new();
    dispatch(&state, jar, &uri, form.as_ref(), &LOGIN_GROUP, |ctl, session| {
        ctl.submit_login(session, form.as_ref().unwrap_or(&empty))
    })
}

/// GET /admin/logout
async fn logout(State(state): State<AppState>, jar: CookieJar, uri: Uri) -> Response {
    dispatch(&state, jar, &uri, None, &PROTECTED_GROUP, |ctl, session| {
        ctl.logout(session)
    })
}

/// GET /admin/users
async fn users_page(State(state): State<AppState>, jar: CookieJar, uri: Uri) -> Response {
    dispatch(&state, jar, &uri, None, &PROTECTED_GROUP, |ctl, session| {
        ctl.list_users(session)
    })
}

/// GET /admin
async fn dashboard(State(state): State<AppState>, jar: CookieJar, uri: Uri) -> Response {
    dispatch(&state, jar, &uri, None, &PROTECTED_GROUP, |ctl, session| {
        ctl.dashboard(session)
    })
}

/// GET /admin/
async fn dashboard_slash(State(state): State<AppState>) -> Response {
    into_response(Outcome::Redirect(admin_url(
        &state.config.base_url,
        DASHBOARD_PATH,
    )))
}

/// A body that isn't a urlencoded form counts as no form at all; the filters
/// and handlers decide what happens next.
fn form_body(form: Result<Form<FormData>, FormRejection>) -> Option<FormData> {
    match form {
        Ok(Form(form)) => Some(form),
        Err(rejection) => {
            tracing::debug!("Ignoring request body: {}", rejection);
            None
        }
    }
}

fn dispatch(
    state: &AppState,
    jar: CookieJar,
    uri: &Uri,
    form: Option<&FormData>,
    group: &RouteGroup,
    handler: impl FnOnce(&AuthController<'_>, &mut Session) -> Outcome,
) -> Response {
    let session_id = jar
        .get(SESSION_COOKIE_NAME)
        .map(|c| c.value().to_string())
        .unwrap_or_else(generate_session_id);
    let mut session = state.sessions.load(&session_id);
    let was_logged_in = session.logged_in();

    let mut ctx = FilterContext {
        session: &mut session,
        users: &state.users,
        tokens: &state.tokens,
        form,
        base_url: &state.config.base_url,
    };
    let outcome = match FilterChain::run(group, &mut ctx) {
        // Forged or stale submission: nothing else runs and the session is left as it was
        Err(e) => return e.into_response(),
        Ok(FilterOutcome::Deny { location }) => Outcome::Redirect(location),
        Ok(FilterOutcome::Allow) => handler(&state.controller(uri.path()), &mut session),
    };

    // New id on login so a pre-login session id can't be reused
    let session_id = if !was_logged_in && session.logged_in() {
        state.sessions.remove(&session_id);
        generate_session_id()
    } else {
        session_id
    };
    state.sessions.save(&session_id, session);

    let cookie = Cookie::build((SESSION_COOKIE_NAME, session_id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.base_url.starts_with("https://"))
        .max_age(time::Duration::hours(state.config.session_expiry_hours))
        .build();

    (jar.add(cookie), into_response(outcome)).into_response()
}

fn into_response(outcome: Outcome) -> Response {
    match outcome {
        Outcome::Redirect(location) => (StatusCode::FOUND, [(header::LOCATION, location)]).into_response(),
        Outcome::Render(view) => match templates::render(view) {
            Ok(body) => Html(body).into_response(),
            Err(e) => {
                tracing::error!("Template error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
            }
        },
    }
}
