use clap::{Arg, ArgAction, ArgMatches, Command};

pub const ARG_SESSION_TTL: &str = "session-ttl";
pub const ARG_SESSION_SWEEP_INTERVAL: &str = "session-sweep-interval";
pub const ARG_COOKIE_SECURE: &str = "cookie-secure";

#[derive(Debug)]
pub struct Options {
    pub ttl_seconds: u64,
    pub sweep_interval_seconds: u64,
    pub cookie_secure: bool,
}

impl Options {
    /// Parse session arguments from matches.
    ///
    /// # Errors
    /// Returns an error if a value is missing.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let read_seconds = |id: &str| -> anyhow::Result<u64> {
            matches
                .get_one::<u64>(id)
                .copied()
                .ok_or_else(|| anyhow::anyhow!("missing required argument: --{id}"))
        };

        Ok(Self {
            ttl_seconds: read_seconds(ARG_SESSION_TTL)?,
            sweep_interval_seconds: read_seconds(ARG_SESSION_SWEEP_INTERVAL)?,
            cookie_secure: matches.get_flag(ARG_COOKIE_SECURE),
        })
    }
}

#[must_use]
/// Upper bound for `--session-ttl`: one year.
pub const MAX_SESSION_TTL: u64 = 31_536_000;

pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SESSION_TTL)
                .long(ARG_SESSION_TTL)
                .help("Session lifetime in seconds")
                .env("GATEHOUSE_SESSION_TTL")
                .default_value("43200")
                .value_parser(clap::value_parser!(u64).range(1..=MAX_SESSION_TTL)),
        )
        .arg(
            Arg::new(ARG_SESSION_SWEEP_INTERVAL)
                .long(ARG_SESSION_SWEEP_INTERVAL)
                .help("Seconds between purges of expired sessions")
                .env("GATEHOUSE_SESSION_SWEEP_INTERVAL")
                .default_value("60")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_COOKIE_SECURE)
                .long(ARG_COOKIE_SECURE)
                .help("Mark cookies Secure (serve behind HTTPS)")
                .env("GATEHOUSE_COOKIE_SECURE")
                .action(ArgAction::SetTrue),
        )
}
