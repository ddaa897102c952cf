//! HTML pages. Templates live in `templates/` and are auto-escaped.

use askama::Template;
use axum::{
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
};
use tracing::error;

use crate::api::handlers::flash::Flash;

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginPage {
    flash_kind: &'static str,
    flash_message: String,
}

#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterPage {
    flash_kind: &'static str,
    flash_message: String,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardPage {
    flash_kind: &'static str,
    flash_message: String,
    username: String,
}

fn flash_parts(flash: Option<Flash>) -> (&'static str, String) {
    flash.map_or(("", String::new()), |flash| {
        (flash.kind.as_str(), flash.message)
    })
}

impl LoginPage {
    #[must_use]
    pub fn new(flash: Option<Flash>) -> Self {
        let (flash_kind, flash_message) = flash_parts(flash);
        Self {
            flash_kind,
            flash_message,
        }
    }
}

impl RegisterPage {
    #[must_use]
    pub fn new(flash: Option<Flash>) -> Self {
        let (flash_kind, flash_message) = flash_parts(flash);
        Self {
            flash_kind,
            flash_message,
        }
    }
}

impl DashboardPage {
    #[must_use]
    pub fn new(username: String, flash: Option<Flash>) -> Self {
        let (flash_kind, flash_message) = flash_parts(flash);
        Self {
            flash_kind,
            flash_message,
            username,
        }
    }
}

/// Render `page` with `headers`, or a bare 500 if the template fails.
pub(crate) fn render<T: Template>(headers: HeaderMap, page: &T) -> Response {
    match page.render() {
        Ok(body) => (headers, Html(body)).into_response(),
        Err(err) => {
            error!("Failed to render template: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
