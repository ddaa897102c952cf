//! # Gatehouse (session-based login service)
//!
//! `gatehouse` serves a small register / login / dashboard / logout flow backed
//! by hashed password storage and server-side sessions.
//!
//! ## Auth State Machine
//!
//! A client is either **anonymous** or **authenticated**. The only way to become
//! authenticated is a successful login, which replaces the session state
//! wholesale. Logout destroys the session. Protected pages are gated on every
//! request by a pure predicate over the current session state.
//!
//! ```text
//! Anonymous --(login success)--> Authenticated
//! Authenticated --(logout)--> Anonymous
//! Anonymous --(login failure)--> Anonymous
//! ```
//!
//! ## Collaborators
//!
//! The core in [`auth`] never touches storage or hashing directly. It is handed
//! a credential store, a password hasher and a session store at construction, so
//! backends are swappable: [`store::memory`] for volatile process-lifetime state
//! and [`store::postgres`] for durable state.
//!
//! ## Enumeration Resistance
//!
//! "Unknown user" and "wrong password" are distinct internally (for logs) but
//! render the same user-visible message, and both paths run one hash
//! verification so their timing matches.

pub mod api;
pub mod auth;
pub mod cli;
pub mod hashing;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

/// `name:version:short-hash`, sent as the `X-App` response header.
#[must_use]
pub fn x_app_value() -> String {
    let short_hash = if GIT_COMMIT_HASH.len() > 7 {
        &GIT_COMMIT_HASH[0..7]
    } else {
        ""
    };
    format!(
        "{}:{}:{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_hash
    )
}
