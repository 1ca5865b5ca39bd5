pub mod admin;
pub mod auth;
pub mod config;
pub mod error;
pub mod filters;
pub mod session;
pub mod state;
pub mod users;

use axum::Router;
use tower_http::{services::ServeDir, trace::TraceLayer};

pub use state::AppState;

/// Full application: admin routes, static assets and request tracing.
pub fn app(state: AppState) -> Router {
    admin::admin_router(state)
        .nest_service("/static", ServeDir::new("static"))
        .layer(TraceLayer::new_for_http())
}
