//! Maps validated CLI arguments to the action to run.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{self, session};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches
        .get_one::<u16>(commands::ARG_PORT)
        .copied()
        .context("missing required argument: --port")?;
    let dsn = matches
        .get_one::<String>(commands::ARG_DSN)
        .cloned()
        .filter(|dsn| !dsn.trim().is_empty());

    let session_opts = session::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        session_ttl_seconds: session_opts.ttl_seconds,
        session_sweep_interval_seconds: session_opts.sweep_interval_seconds,
        cookie_secure: session_opts.cookie_secure,
    }))
}
