//! Askama templates for the admin UI.

use askama::Template;

use crate::auth::{AdminView, PageContext};
use crate::filters;
use crate::users::{User, UserRecord};

#[derive(Template)]
#[template(path = "admin/create-user.html")]
pub struct CreateUserTemplate {
    pub page: PageContext,
    pub errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "admin/created-user.html")]
pub struct CreatedUserTemplate {
    pub page: PageContext,
    pub user: User,
    pub saved: bool,
}

#[derive(Template)]
#[template(path = "admin/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "admin/users.html")]
pub struct UsersTemplate {
    pub page: PageContext,
    pub users: Vec<UserRecord>,
}

#[derive(Template)]
#[template(path = "admin/dashboard.html")]
pub struct DashboardTemplate {
    pub page: PageContext,
    pub email: Option<String>,
    pub user_count: usize,
}

/// Render a controller view to HTML.
pub fn render(view: AdminView) -> askama::Result<String> {
    match view {
        AdminView::CreateUser { page, errors } => CreateUserTemplate { page, errors }.render(),
        AdminView::CreatedUser { page, user, saved } => {
            CreatedUserTemplate { page, user, saved }.render()
        }
        AdminView::Login { page, errors } => LoginTemplate { page, errors }.render(),
        AdminView::Users { page, users } => UsersTemplate { page, users }.render(),
        AdminView::Dashboard {
            page,
            email,
            user_count,
        } => DashboardTemplate {
            page,
            email,
            user_count,
        }
        .render(),
    }
}
