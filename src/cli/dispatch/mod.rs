//! Command-line argument dispatch and server initialization.
//!
//! This module parses validated CLI arguments and maps them to the
//! appropriate action, such as starting the API server with its full
//! configuration state.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{auth, messaging};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let auth_opts = auth::Options::parse(matches)?;
    let messaging_opts = messaging::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        session_secret: auth_opts.session_secret,
        session_ttl_seconds: auth_opts.session_ttl_seconds,
        secure_cookies: auth_opts.secure_cookies,
        messaging_mode: messaging_opts.mode,
        twilio_account_sid: messaging_opts.twilio_account_sid,
        twilio_auth_token: messaging_opts.twilio_auth_token,
        twilio_from_number: messaging_opts.twilio_from_number,
        transport_timeout_seconds: messaging_opts.transport_timeout_seconds,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_secret_required() {
        temp_env::with_vars(
            [
                ("CARELINE_SESSION_SECRET", None::<&str>),
                ("CARELINE_DSN", Some("postgres://localhost:5432/careline")),
            ],
            || {
                let command = crate::cli::commands::new();
                let result = command.try_get_matches_from(vec!["careline"]);
                // clap enforces the session secret before dispatch runs.
                assert!(result.is_err());
            },
        );
    }

    #[test]
    fn server_action_carries_messaging_options() {
        let command = crate::cli::commands::new();
        let matches = command
            .try_get_matches_from(vec![
                "careline",
                "--dsn",
                "postgres://localhost:5432/careline",
                "--session-secret",
                "0123456789abcdef",
                "--messaging-mode",
                "live",
                "--transport-timeout-seconds",
                "3",
            ])
            .unwrap();
        let action = handler(&matches).unwrap();
        let Action::Server(args) = action;
        assert_eq!(args.messaging_mode, "live");
        assert_eq!(args.transport_timeout_seconds, 3);
        assert_eq!(args.port, 8080);
    }
}
