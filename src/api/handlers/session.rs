//! Session cookie plumbing. The cookie carries the opaque session id only;
//! everything else stays server-side.

use axum::http::{
    header::{InvalidHeaderValue, COOKIE},
    HeaderMap, HeaderValue,
};

use crate::api::state::ApiConfig;
use crate::auth::SessionId;

pub(crate) const SESSION_COOKIE_NAME: &str = "gatehouse_session";

/// Build an `HttpOnly` cookie carrying the session id.
pub(crate) fn session_cookie(
    config: &ApiConfig,
    id: &SessionId,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = config.session_ttl_seconds();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}",
        id.as_str()
    );
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(crate) fn clear_session_cookie(config: &ApiConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Session id presented by the client, if any.
pub(crate) fn extract_session_id(headers: &HeaderMap) -> Option<SessionId> {
    cookie_value(headers, SESSION_COOKIE_NAME).map(SessionId::from_client)
}

/// First non-empty value for `name` across all `Cookie` headers.
pub(crate) fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            let mut parts = pair.trim().splitn(2, '=');
            let key = parts.next()?.trim();
            let val = parts.next()?.trim();
            (key == name && !val.is_empty()).then(|| val.to_string())
        })
        .next()
}
