use anyhow::Result;
use clap::{Arg, Command};
use secrecy::SecretString;

pub const ARG_MESSAGING_MODE: &str = "messaging-mode";
pub const ARG_TWILIO_ACCOUNT_SID: &str = "twilio-account-sid";
pub const ARG_TWILIO_AUTH_TOKEN: &str = "twilio-auth-token";
pub const ARG_TWILIO_FROM_NUMBER: &str = "twilio-from-number";
pub const ARG_TRANSPORT_TIMEOUT_SECONDS: &str = "transport-timeout-seconds";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_MESSAGING_MODE)
                .long(ARG_MESSAGING_MODE)
                .help("Messaging mode: demo (simulated transport) or live")
                .env("CARELINE_MESSAGING_MODE")
                .default_value("demo")
                .value_parser(["demo", "live"]),
        )
        .arg(
            Arg::new(ARG_TWILIO_ACCOUNT_SID)
                .long(ARG_TWILIO_ACCOUNT_SID)
                .help("Twilio account SID for live mode")
                .env("CARELINE_TWILIO_ACCOUNT_SID"),
        )
        .arg(
            Arg::new(ARG_TWILIO_AUTH_TOKEN)
                .long(ARG_TWILIO_AUTH_TOKEN)
                .help("Twilio auth token for live mode")
                .env("CARELINE_TWILIO_AUTH_TOKEN"),
        )
        .arg(
            Arg::new(ARG_TWILIO_FROM_NUMBER)
                .long(ARG_TWILIO_FROM_NUMBER)
                .help("E.164 sender number for live mode")
                .env("CARELINE_TWILIO_FROM_NUMBER"),
        )
        .arg(
            Arg::new(ARG_TRANSPORT_TIMEOUT_SECONDS)
                .long(ARG_TRANSPORT_TIMEOUT_SECONDS)
                .help("Upper bound for a single transport call")
                .env("CARELINE_TRANSPORT_TIMEOUT_SECONDS")
                .default_value("10")
                .value_parser(clap::value_parser!(u64)),
        )
}

pub struct Options {
    pub mode: String,
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<SecretString>,
    pub twilio_from_number: Option<String>,
    pub transport_timeout_seconds: u64,
}

impl Options {
    /// Read messaging options from parsed CLI matches.
    ///
    /// # Errors
    /// Currently infallible; kept fallible for parity with the other option groups.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        Ok(Self {
            mode: matches
                .get_one::<String>(ARG_MESSAGING_MODE)
                .cloned()
                .unwrap_or_else(|| "demo".to_string()),
            twilio_account_sid: matches.get_one::<String>(ARG_TWILIO_ACCOUNT_SID).cloned(),
            twilio_auth_token: matches
                .get_one::<String>(ARG_TWILIO_AUTH_TOKEN)
                .cloned()
                .map(SecretString::from),
            twilio_from_number: matches.get_one::<String>(ARG_TWILIO_FROM_NUMBER).cloned(),
            transport_timeout_seconds: matches
                .get_one::<u64>(ARG_TRANSPORT_TIMEOUT_SECONDS)
                .copied()
                .unwrap_or(10),
        })
    }
}
