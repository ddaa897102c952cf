use axum::{extract::Extension, http::HeaderMap, response::Response};
use std::sync::Arc;
use tracing::{debug, error, instrument};

use super::{
    flash::{redirect_with_flash, take_flash, Flash},
    session::extract_session_id,
};
use crate::api::{
    state::AppState,
    views::{render, DashboardPage},
};

#[utoipa::path(
    get,
    path = "/dashboard",
    responses(
        (status = 200, description = "Dashboard for the authenticated user", content_type = "text/html"),
        (status = 303, description = "Not logged in, redirect to /login")
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn dashboard(headers: HeaderMap, state: Extension<Arc<AppState>>) -> Response {
    let session = extract_session_id(&headers);

    match state.auth().authorize(session.as_ref()).await {
        Ok(principal) => {
            let mut response_headers = HeaderMap::new();
            let flash = take_flash(&headers, &mut response_headers);
            render(
                response_headers,
                &DashboardPage::new(principal.username, flash),
            )
        }
        Err(err) => {
            if err.is_collaborator() {
                error!("Authorization failed: {err}");
            } else {
                debug!(code = err.code(), "dashboard denied");
            }
            redirect_with_flash(
                state.config(),
                HeaderMap::new(),
                "/login",
                &Flash::error(err.public_message()),
            )
        }
    }
}
