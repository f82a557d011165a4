//! Message transports: simulated (demo) and Twilio REST.
//!
//! The provider is a black box with a success/failure + status callback
//! contract. Transport failures are captured by the dispatcher and persisted
//! on the communication row rather than propagated as request errors.

use rand::Rng;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;
use ulid::Ulid;

use super::CommunicationKind;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("provider rejected the message: {0}")]
    Provider(String),
    #[error("simulated delivery failure")]
    Simulated,
}

/// Credentials for the live Twilio transport.
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: SecretString,
    pub from_number: String,
}

impl std::fmt::Debug for TwilioConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"***")
            .field("from_number", &self.from_number)
            .finish()
    }
}

/// Simulated transport for demo mode: no credentials, no network.
#[derive(Debug, Clone, Copy)]
pub struct DemoTransport {
    success_rate: f64,
}

impl DemoTransport {
    pub const DEFAULT_SUCCESS_RATE: f64 = 0.9;

    #[must_use]
    pub const fn new(success_rate: f64) -> Self {
        Self { success_rate }
    }

    /// Simulate a send, returning a synthetic provider id on success.
    ///
    /// # Errors
    /// Fails on the simulated-failure branch of the roll.
    pub fn send(&self, kind: CommunicationKind, to: &str) -> Result<String, TransportError> {
        if rand::thread_rng().gen_bool(self.success_rate.clamp(0.0, 1.0)) {
            let id = match kind {
                CommunicationKind::Sms => format!("demo-sms-{}", Ulid::new()),
                CommunicationKind::Voice => format!("demo-voice-{}", Ulid::new()),
            };
            info!(to = %to, transport_id = %id, "demo transport send");
            Ok(id)
        } else {
            Err(TransportError::Simulated)
        }
    }
}

impl Default for DemoTransport {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SUCCESS_RATE)
    }
}

#[derive(Debug, Deserialize)]
struct TwilioResponse {
    sid: String,
}

#[derive(Debug, Deserialize)]
struct TwilioErrorBody {
    message: Option<String>,
}

/// Live transport speaking the Twilio Messages/Calls REST API.
#[derive(Debug)]
pub struct TwilioTransport {
    config: TwilioConfig,
    client: Client,
    base_url: String,
}

impl TwilioTransport {
    const DEFAULT_BASE_URL: &'static str = "https://api.twilio.com";

    #[must_use]
    pub fn new(config: TwilioConfig, client: Client) -> Self {
        Self {
            config,
            client,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Send an SMS or place a voice call, returning the provider message id.
    ///
    /// # Errors
    /// Fails on network errors, timeouts, or a non-success provider response.
    pub async fn send(
        &self,
        kind: CommunicationKind,
        to: &str,
        content: &str,
    ) -> Result<String, TransportError> {
        let (resource, params) = match kind {
            CommunicationKind::Sms => (
                "Messages.json",
                vec![
                    ("To", to.to_string()),
                    ("From", self.config.from_number.clone()),
                    ("Body", content.to_string()),
                ],
            ),
            CommunicationKind::Voice => (
                "Calls.json",
                vec![
                    ("To", to.to_string()),
                    ("From", self.config.from_number.clone()),
                    (
                        "Twiml",
                        format!("<Response><Say>{}</Say></Response>", content),
                    ),
                ],
            ),
        };

        let url = format!(
            "{}/2010-04-01/Accounts/{}/{resource}",
            self.base_url, self.config.account_sid
        );

        let response = self
            .client
            .post(&url)
            .basic_auth(
                &self.config.account_sid,
                Some(self.config.auth_token.expose_secret()),
            )
            .form(&params)
            .send()
            .await?;

        if response.status().is_success() {
            let body: TwilioResponse = response.json().await?;
            Ok(body.sid)
        } else {
            let status = response.status();
            let detail = response
                .json::<TwilioErrorBody>()
                .await
                .ok()
                .and_then(|body| body.message)
                .unwrap_or_else(|| format!("HTTP {status}"));
            Err(TransportError::Provider(detail))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_always_succeeds_at_full_rate() {
        let transport = DemoTransport::new(1.0);
        let id = transport.send(CommunicationKind::Sms, "+15551234567").unwrap();
        assert!(id.starts_with("demo-sms-"));
        let id = transport
            .send(CommunicationKind::Voice, "+15551234567")
            .unwrap();
        assert!(id.starts_with("demo-voice-"));
    }

    #[test]
    fn demo_always_fails_at_zero_rate() {
        let transport = DemoTransport::new(0.0);
        let result = transport.send(CommunicationKind::Sms, "+15551234567");
        assert!(matches!(result, Err(TransportError::Simulated)));
    }

    #[test]
    fn demo_ids_are_unique() {
        let transport = DemoTransport::new(1.0);
        let first = transport.send(CommunicationKind::Sms, "+15551234567").unwrap();
        let second = transport.send(CommunicationKind::Sms, "+15551234567").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn twilio_config_debug_hides_token() {
        let config = TwilioConfig {
            account_sid: "AC123".to_string(),
            auth_token: SecretString::from("hunter2".to_string()),
            from_number: "+15550001111".to_string(),
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
    }
}
