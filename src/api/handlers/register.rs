use axum::{
    extract::{Extension, Form},
    http::HeaderMap,
    response::Response,
};
use secrecy::SecretString;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;

use super::flash::{redirect_with_flash, take_flash, Flash};
use crate::api::{
    state::AppState,
    views::{render, RegisterPage},
};
use crate::auth::{Error, Registration, ValidationError};

const MSG_REGISTERED: &str = "You are now registered";

/// Registration form body. Missing fields deserialize as empty and are
/// rejected by validation.
#[derive(ToSchema, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    #[serde(default, rename = "confirmPassword", alias = "confirm_password")]
    confirm_password: Option<String>,
}

impl From<RegisterForm> for Registration {
    fn from(form: RegisterForm) -> Self {
        Self::new(
            form.username,
            SecretString::from(form.password),
            form.confirm_password.map(SecretString::from),
        )
    }
}

#[utoipa::path(
    get,
    path = "/register",
    responses(
        (status = 200, description = "Registration form", content_type = "text/html")
    ),
    tag = "auth"
)]
pub async fn register_form(headers: HeaderMap) -> Response {
    let mut response_headers = HeaderMap::new();
    let flash = take_flash(&headers, &mut response_headers);
    render(response_headers, &RegisterPage::new(flash))
}

#[utoipa::path(
    post,
    path = "/register",
    request_body(content = RegisterForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Registered, redirect to /login; or rejected, redirect to /register with a flash message")
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn register(
    state: Extension<Arc<AppState>>,
    form: Option<Form<RegisterForm>>,
) -> Response {
    let config = state.config();

    // Undecodable bodies are treated like a form with nothing filled in.
    let Some(Form(form)) = form else {
        let err = Error::from(ValidationError::EmptyUsername);
        return redirect_with_flash(
            config,
            HeaderMap::new(),
            "/register",
            &Flash::error(err.public_message()),
        );
    };

    let registration = Registration::from(form);
    match state.auth().register(&registration).await {
        Ok(()) => {
            info!(username = %registration.username, "registration succeeded");
            redirect_with_flash(
                config,
                HeaderMap::new(),
                "/login",
                &Flash::success(MSG_REGISTERED),
            )
        }
        Err(err) => {
            if err.is_collaborator() {
                error!("Registration failed: {err}");
            } else {
                info!(code = err.code(), "registration rejected");
            }
            redirect_with_flash(
                config,
                HeaderMap::new(),
                "/register",
                &Flash::error(err.public_message()),
            )
        }
    }
}
