//! One-shot flash messages carried across a redirect in a short-lived cookie.
//!
//! A POST handler sets the cookie and redirects; the next page render reads it
//! and clears it.

use axum::{
    http::{header::SET_COOKIE, HeaderMap, HeaderValue},
    response::{IntoResponse, Redirect, Response},
};
use tracing::error;
use url::form_urlencoded;

use super::session::cookie_value;
use crate::api::state::ApiConfig;

const FLASH_COOKIE_NAME: &str = "gatehouse_flash";
const FLASH_MAX_AGE_SECONDS: u64 = 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlashKind {
    Success,
    Error,
}

impl FlashKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "success" => Some(Self::Success),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }

    fn encode(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .append_pair("kind", self.kind.as_str())
            .append_pair("msg", &self.message)
            .finish()
    }

    fn decode(value: &str) -> Option<Self> {
        let mut kind = None;
        let mut message = None;
        for (key, val) in form_urlencoded::parse(value.as_bytes()) {
            match key.as_ref() {
                "kind" => kind = FlashKind::parse(&val),
                "msg" => message = Some(val.into_owned()),
                _ => {}
            }
        }
        Some(Self {
            kind: kind?,
            message: message.filter(|m| !m.is_empty())?,
        })
    }
}

fn flash_cookie(config: &ApiConfig, flash: &Flash) -> Option<HeaderValue> {
    let mut cookie = format!(
        "{FLASH_COOKIE_NAME}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={FLASH_MAX_AGE_SECONDS}",
        flash.encode()
    );
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
        .map_err(|err| error!("Failed to build flash cookie: {err}"))
        .ok()
}

fn clear_flash_cookie() -> HeaderValue {
    HeaderValue::from_static("gatehouse_flash=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Read the pending flash, appending a clearing cookie to `response_headers`
/// when one was present.
pub(crate) fn take_flash(headers: &HeaderMap, response_headers: &mut HeaderMap) -> Option<Flash> {
    let raw = cookie_value(headers, FLASH_COOKIE_NAME)?;
    response_headers.append(SET_COOKIE, clear_flash_cookie());
    Flash::decode(&raw)
}

/// `303 See Other` to `location` carrying `flash`, plus any cookies already in
/// `headers`.
pub(crate) fn redirect_with_flash(
    config: &ApiConfig,
    mut headers: HeaderMap,
    location: &str,
    flash: &Flash,
) -> Response {
    if let Some(cookie) = flash_cookie(config, flash) {
        headers.append(SET_COOKIE, cookie);
    }
    (headers, Redirect::to(location)).into_response()
}
