use axum::response::Redirect;

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 303, description = "Redirect to /login")
    ),
    tag = "auth"
)]
pub async fn root() -> Redirect {
    Redirect::to("/login")
}
