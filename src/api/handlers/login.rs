use axum::{
    extract::{Extension, Form},
    http::{header::SET_COOKIE, HeaderMap},
    response::Response,
};
use secrecy::SecretString;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;

use super::{
    flash::{redirect_with_flash, take_flash, Flash},
    session::{extract_session_id, session_cookie},
};
use crate::api::{
    state::AppState,
    views::{render, LoginPage},
};
use crate::auth::{AuthError, Credentials, Error};

const MSG_LOGGED_IN: &str = "Logged in successfully";

#[derive(ToSchema, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

impl From<LoginForm> for Credentials {
    fn from(form: LoginForm) -> Self {
        Self::new(form.username, SecretString::from(form.password))
    }
}

#[utoipa::path(
    get,
    path = "/login",
    responses(
        (status = 200, description = "Login form", content_type = "text/html")
    ),
    tag = "auth"
)]
pub async fn login_form(headers: HeaderMap) -> Response {
    let mut response_headers = HeaderMap::new();
    let flash = take_flash(&headers, &mut response_headers);
    render(response_headers, &LoginPage::new(flash))
}

#[utoipa::path(
    post,
    path = "/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Authenticated, session cookie set and redirect to /dashboard; or rejected, redirect to /login with a uniform message")
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    form: Option<Form<LoginForm>>,
) -> Response {
    let config = state.config();

    let Some(Form(form)) = form else {
        let err = Error::from(AuthError::BadCredentials);
        return redirect_with_flash(
            config,
            HeaderMap::new(),
            "/login",
            &Flash::error(err.public_message()),
        );
    };

    let credentials = Credentials::from(form);
    let current = extract_session_id(&headers);

    match state.auth().login(&credentials, current.as_ref()).await {
        Ok(session) => {
            info!(username = %credentials.username, "login succeeded");
            let mut response_headers = HeaderMap::new();
            match session_cookie(config, &session) {
                Ok(cookie) => {
                    response_headers.append(SET_COOKIE, cookie);
                }
                Err(err) => {
                    error!("Failed to build session cookie: {err}");
                    let err = Error::collaborator(err.into());
                    return redirect_with_flash(
                        config,
                        HeaderMap::new(),
                        "/login",
                        &Flash::error(err.public_message()),
                    );
                }
            }
            redirect_with_flash(
                config,
                response_headers,
                "/dashboard",
                &Flash::success(MSG_LOGGED_IN),
            )
        }
        Err(err) => {
            if err.is_collaborator() {
                error!("Login failed: {err}");
            } else {
                // The code is internal; the client only ever sees the uniform message.
                info!(code = err.code(), "login rejected");
            }
            redirect_with_flash(
                config,
                HeaderMap::new(),
                "/login",
                &Flash::error(err.public_message()),
            )
        }
    }
}
