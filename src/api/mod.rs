#![allow(clippy::needless_for_each)]

use crate::api::handlers::{
    dashboard, dashboard::__path_dashboard, health, health::__path_health, login,
    login::__path_login, login::__path_login_form, logout, logout::__path_logout, register,
    register::__path_register, register::__path_register_form, root, root::__path_root,
};
use anyhow::Result;
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    routing::get,
    Extension, Router,
};
use std::{future::Future, sync::Arc};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info, info_span, Span};
use ulid::Ulid;
use utoipa::OpenApi;

pub mod handlers;
pub mod state;
pub mod views;

pub use state::{ApiConfig, AppState};

#[derive(OpenApi)]
#[openapi(
    paths(
        root,
        register_form,
        register,
        login_form,
        login,
        dashboard,
        logout,
        health
    ),
    components(schemas(
        health::Health,
        register::RegisterForm,
        login::LoginForm
    )),
    tags(
        (name = "auth", description = "Registration, login and session-gated pages"),
        (name = "health", description = "Liveness of the credential and session stores")
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Build the application router with request-id and tracing layers.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root::root))
        .route(
            "/register",
            get(register::register_form).post(register::register),
        )
        .route("/login", get(login::login_form).post(login::login))
        .route("/dashboard", get(dashboard::dashboard))
        .route("/logout", get(logout::logout))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(state.clone())),
        )
        .route("/health", get(health::health).options(health::health))
        .layer(Extension(state))
}

/// Bind `[::]:port` and serve until ctrl-c.
///
/// # Errors
/// Returns an error if the port cannot be bound or the server fails.
pub async fn new(port: u16, state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    serve(listener, router(state), shutdown_signal()).await
}

/// Serve `app` on an already bound listener until `shutdown` resolves.
///
/// # Errors
/// Returns an error if the server fails.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown.await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
