use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use secrecy::SecretString;

pub const ARG_SESSION_SECRET: &str = "session-secret";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_SECURE_COOKIES: &str = "secure-cookies";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SESSION_SECRET)
                .long(ARG_SESSION_SECRET)
                .help("Secret key used to sign bearer credentials")
                .env("CARELINE_SESSION_SECRET")
                .required(true),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Credential and cookie lifetime in seconds")
                .env("CARELINE_SESSION_TTL_SECONDS")
                .default_value("604800")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_SECURE_COOKIES)
                .long(ARG_SECURE_COOKIES)
                .help("Mark auth cookies as Secure (HTTPS deployments)")
                .env("CARELINE_SECURE_COOKIES")
                .action(ArgAction::SetTrue),
        )
}

pub struct Options {
    pub session_secret: SecretString,
    pub session_ttl_seconds: i64,
    pub secure_cookies: bool,
}

impl Options {
    /// Read auth options from parsed CLI matches.
    ///
    /// # Errors
    /// Returns an error if the session secret is missing.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        let session_secret = matches
            .get_one::<String>(ARG_SESSION_SECRET)
            .cloned()
            .context("missing required argument: --session-secret")?;

        let session_ttl_seconds = matches
            .get_one::<i64>(ARG_SESSION_TTL_SECONDS)
            .copied()
            .unwrap_or(604_800);

        Ok(Self {
            session_secret: SecretString::from(session_secret),
            session_ttl_seconds,
            secure_cookies: matches.get_flag(ARG_SECURE_COOKIES),
        })
    }
}
