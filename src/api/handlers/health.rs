use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};
use utoipa::ToSchema;

use crate::api::state::AppState;
use crate::{x_app_value, GIT_COMMIT_HASH};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    credentials: String,
    sessions: String,
}

fn status(result: &anyhow::Result<()>) -> String {
    let status = if result.is_ok() { "ok" } else { "error" };
    status.to_string()
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Credential and session stores are reachable", body = Health),
        (status = 503, description = "A store is unreachable", body = Health)
    ),
    tag = "health"
)]
pub async fn health(method: Method, state: Extension<Arc<AppState>>) -> impl IntoResponse {
    let credentials = state.auth().credentials().ping().await;
    if let Err(err) = &credentials {
        error!("Credential store ping failed: {err}");
    }

    let sessions = state.auth().sessions().ping().await;
    if let Err(err) = &sessions {
        error!("Session store ping failed: {err}");
    }

    let is_healthy = credentials.is_ok() && sessions.is_ok();

    let health = Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        credentials: status(&credentials),
        sessions: status(&sessions),
    };

    let body = if method == Method::GET {
        Json(&health).into_response()
    } else {
        Body::empty().into_response()
    };

    let headers = x_app_value()
        .parse::<HeaderValue>()
        .map(|value| {
            debug!("X-App header: {:?}", value);
            let mut headers = HeaderMap::new();
            headers.insert("X-App", value);
            headers
        })
        .map_err(|err| error!("Failed to parse X-App header: {}", err))
        .unwrap_or_default();

    if is_healthy {
        (StatusCode::OK, headers, body)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, headers, body)
    }
}
