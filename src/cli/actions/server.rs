use crate::{
    api,
    api::handlers::auth::AuthConfig,
    messaging::{MessagingMode, MessagingOptions, TwilioConfig},
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::time::Duration;
use tracing::warn;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub session_secret: SecretString,
    pub session_ttl_seconds: i64,
    pub secure_cookies: bool,
    pub messaging_mode: String,
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<SecretString>,
    pub twilio_from_number: Option<String>,
    pub transport_timeout_seconds: u64,
}

/// Execute the server action.
///
/// # Errors
/// Returns an error if configuration is invalid or the server fails to start.
pub async fn handle(action: super::Action) -> Result<()> {
    let super::Action::Server(args) = action;

    let auth_config = AuthConfig::new(args.session_secret)
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_secure_cookies(args.secure_cookies);

    let twilio = match (
        args.twilio_account_sid,
        args.twilio_auth_token,
        args.twilio_from_number,
    ) {
        (Some(account_sid), Some(auth_token), Some(from_number)) => Some(TwilioConfig {
            account_sid,
            auth_token,
            from_number,
        }),
        _ => None,
    };

    let mode = resolve_mode(&args.messaging_mode, twilio.is_some())?;

    let messaging = MessagingOptions {
        mode,
        twilio,
        transport_timeout: Duration::from_secs(args.transport_timeout_seconds),
    };

    api::new(args.port, args.dsn, auth_config, messaging).await
}

/// Live mode without provider credentials degrades to simulated delivery.
fn resolve_mode(mode: &str, twilio_configured: bool) -> Result<MessagingMode> {
    let mode = mode
        .parse::<MessagingMode>()
        .context("invalid messaging mode")?;

    if mode == MessagingMode::Live && !twilio_configured {
        warn!("live messaging mode requested without Twilio credentials, falling back to demo");
        return Ok(MessagingMode::Demo);
    }

    Ok(mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_mode_is_an_error() {
        let err = resolve_mode("dry-run", false).unwrap_err();
        assert!(err.to_string().contains("invalid messaging mode"));
    }

    #[test]
    fn live_without_credentials_degrades_to_demo() {
        assert_eq!(resolve_mode("live", false).unwrap(), MessagingMode::Demo);
    }

    #[test]
    fn live_with_credentials_stays_live() {
        assert_eq!(resolve_mode("live", true).unwrap(), MessagingMode::Live);
        assert_eq!(resolve_mode("demo", true).unwrap(), MessagingMode::Demo);
    }
}
