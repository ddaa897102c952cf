use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap},
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::{error, instrument};

use super::{
    flash::{redirect_with_flash, Flash},
    session::{clear_session_cookie, extract_session_id},
};
use crate::api::state::AppState;

#[utoipa::path(
    get,
    path = "/logout",
    responses(
        (status = 303, description = "Session destroyed and cookie cleared, redirect to /login; a store failure adds an error flash")
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn logout(headers: HeaderMap, state: Extension<Arc<AppState>>) -> Response {
    let config = state.config();
    let session = extract_session_id(&headers);
    let outcome = state.auth().logout(session.as_ref()).await;

    // The cookie is cleared even when the store could not be reached.
    let mut response_headers = HeaderMap::new();
    match clear_session_cookie(config) {
        Ok(cookie) => {
            response_headers.append(SET_COOKIE, cookie);
        }
        Err(err) => error!("Failed to build session cookie: {err}"),
    }

    match outcome {
        Ok(()) => (response_headers, Redirect::to("/login")).into_response(),
        Err(err) => {
            error!("Failed to destroy session: {err}");
            redirect_with_flash(
                config,
                response_headers,
                "/login",
                &Flash::error(err.public_message()),
            )
        }
    }
}
