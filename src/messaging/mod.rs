//! Outbound message dispatch and delivery tracking.
//!
//! A dispatch renders the content (placeholder substitution, voice
//! flattening), normalizes the destination number, persists a `PENDING`
//! communication row, invokes the transport with a bounded timeout, and
//! records the immediate outcome. The provider may later post a status
//! callback which [`reconcile`] applies under the monotonic-finality rule:
//! terminal rows are never updated again.
//!
//! There is no retry of a failed dispatch; a failed communication is resent
//! manually by creating a new one.

pub mod phone;
pub mod reconcile;
pub mod status;
pub mod template;
pub mod transport;
pub mod voice;

pub use reconcile::{reconcile, ReconcileOutcome};
pub use status::{map_transport_status, CommunicationStatus};
pub use template::TemplateContext;
pub use transport::{DemoTransport, TransportError, TwilioConfig, TwilioTransport};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

/// Whether dispatches hit the real provider or the simulated transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessagingMode {
    Demo,
    Live,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid messaging mode: {0}")]
pub struct ParseMessagingModeError(String);

impl MessagingMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Demo => "demo",
            Self::Live => "live",
        }
    }
}

impl fmt::Display for MessagingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessagingMode {
    type Err = ParseMessagingModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "demo" => Ok(Self::Demo),
            "live" => Ok(Self::Live),
            other => Err(ParseMessagingModeError(other.to_string())),
        }
    }
}

/// SMS or voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommunicationKind {
    Sms,
    Voice,
}

impl CommunicationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sms => "SMS",
            Self::Voice => "VOICE",
        }
    }
}

impl fmt::Display for CommunicationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommunicationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SMS" => Ok(Self::Sms),
            "VOICE" => Ok(Self::Voice),
            other => Err(format!("invalid communication type: {other}")),
        }
    }
}

/// A persisted outbound message and its delivery state.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Communication {
    pub id: Uuid,
    pub patient_id: Uuid,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    pub phone_number: String,
    pub template_id: Option<Uuid>,
    pub appointment_id: Option<Uuid>,
    pub status: String,
    pub sent_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub transport_message_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

const COMMUNICATION_COLUMNS: &str = r"
    id, patient_id, type, content, phone_number, template_id, appointment_id,
    status, sent_at, delivered_at, failed_at, error_message,
    transport_message_id, created_at
";

/// What a handler asks the dispatcher to send.
#[derive(Debug)]
pub struct DispatchRequest {
    pub patient_id: Uuid,
    pub kind: CommunicationKind,
    pub phone: String,
    pub content: String,
    pub template_id: Option<Uuid>,
    pub appointment_id: Option<Uuid>,
    pub context: TemplateContext,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Invalid phone number format")]
    InvalidPhone,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Startup configuration for the messaging layer.
#[derive(Debug)]
pub struct MessagingOptions {
    pub mode: MessagingMode,
    pub twilio: Option<TwilioConfig>,
    pub transport_timeout: Duration,
}

/// Shared messaging state: the mode toggle and the configured transports.
///
/// The mode lives behind a lock so an admin toggle takes effect for
/// subsequent dispatches without restarting the process.
pub struct MessagingState {
    mode: RwLock<MessagingMode>,
    demo: DemoTransport,
    twilio: Option<TwilioTransport>,
}

impl MessagingState {
    /// Build the messaging state, including the bounded-timeout HTTP client
    /// for the live transport.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(options: MessagingOptions) -> Result<Self> {
        let twilio = match options.twilio {
            Some(config) => {
                let client = reqwest::Client::builder()
                    .user_agent(crate::api::APP_USER_AGENT)
                    .timeout(options.transport_timeout)
                    .build()
                    .context("Failed to build transport HTTP client")?;
                Some(TwilioTransport::new(config, client))
            }
            None => None,
        };

        Ok(Self {
            mode: RwLock::new(options.mode),
            demo: DemoTransport::default(),
            twilio,
        })
    }

    pub async fn mode(&self) -> MessagingMode {
        *self.mode.read().await
    }

    pub async fn set_mode(&self, mode: MessagingMode) {
        let mut current = self.mode.write().await;
        info!(from = %current, to = %mode, "messaging mode changed");
        *current = mode;
    }

    /// Render, validate, persist and send one message.
    ///
    /// Transport failures do not fail the dispatch: the returned row carries
    /// `FAILED` with the error message instead.
    ///
    /// # Errors
    /// Fails on a malformed destination number (before any side effect) or a
    /// database error.
    pub async fn dispatch(
        &self,
        pool: &PgPool,
        request: DispatchRequest,
    ) -> Result<Communication, DispatchError> {
        let content = template::render(&request.content, &request.context);
        let content = match request.kind {
            CommunicationKind::Voice => voice::format_for_voice(&content),
            CommunicationKind::Sms => content,
        };

        // Validate the destination before creating any record.
        let to = phone::normalize(&request.phone).map_err(|_| DispatchError::InvalidPhone)?;

        let pending = insert_pending(pool, &request, &content, &to).await?;

        let outcome = self.transport_send(request.kind, &to, &content).await;

        let row = match outcome {
            Ok(transport_id) => mark_sent(pool, pending.id, &transport_id).await?,
            Err(err) => {
                error!(communication_id = %pending.id, "transport send failed: {err}");
                mark_failed(pool, pending.id, &err.to_string()).await?
            }
        };

        Ok(row)
    }

    async fn transport_send(
        &self,
        kind: CommunicationKind,
        to: &str,
        content: &str,
    ) -> Result<String, TransportError> {
        let mode = self.mode().await;
        match (&self.twilio, mode) {
            (Some(twilio), MessagingMode::Live) => twilio.send(kind, to, content).await,
            _ => self.demo.send(kind, to),
        }
    }
}

async fn insert_pending(
    pool: &PgPool,
    request: &DispatchRequest,
    content: &str,
    to: &str,
) -> Result<Communication, sqlx::Error> {
    let query = format!(
        r"
        INSERT INTO communications
            (patient_id, type, content, phone_number, template_id, appointment_id, status)
        VALUES ($1, $2, $3, $4, $5, $6, 'PENDING')
        RETURNING {COMMUNICATION_COLUMNS}
        "
    );
    sqlx::query_as::<_, Communication>(&query)
        .bind(request.patient_id)
        .bind(request.kind.as_str())
        .bind(content)
        .bind(to)
        .bind(request.template_id)
        .bind(request.appointment_id)
        .fetch_one(pool)
        .await
}

async fn mark_sent(
    pool: &PgPool,
    id: Uuid,
    transport_id: &str,
) -> Result<Communication, sqlx::Error> {
    let query = format!(
        r"
        UPDATE communications
        SET status = 'SENT', sent_at = NOW(), transport_message_id = $2
        WHERE id = $1
        RETURNING {COMMUNICATION_COLUMNS}
        "
    );
    sqlx::query_as::<_, Communication>(&query)
        .bind(id)
        .bind(transport_id)
        .fetch_one(pool)
        .await
}

async fn mark_failed(
    pool: &PgPool,
    id: Uuid,
    error_message: &str,
) -> Result<Communication, sqlx::Error> {
    let query = format!(
        r"
        UPDATE communications
        SET status = 'FAILED', failed_at = NOW(), error_message = $2
        WHERE id = $1
        RETURNING {COMMUNICATION_COLUMNS}
        "
    );
    sqlx::query_as::<_, Communication>(&query)
        .bind(id)
        .bind(error_message)
        .fetch_one(pool)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parses_and_rejects() {
        assert_eq!("demo".parse::<MessagingMode>(), Ok(MessagingMode::Demo));
        assert_eq!("LIVE".parse::<MessagingMode>(), Ok(MessagingMode::Live));
        let err = "dry-run".parse::<MessagingMode>().unwrap_err();
        assert_eq!(err.to_string(), "invalid messaging mode: dry-run");
    }

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("sms".parse::<CommunicationKind>(), Ok(CommunicationKind::Sms));
        assert_eq!(
            "VOICE".parse::<CommunicationKind>(),
            Ok(CommunicationKind::Voice)
        );
        assert!("EMAIL".parse::<CommunicationKind>().is_err());
    }

    #[tokio::test]
    async fn set_mode_takes_effect() {
        let state = MessagingState::new(MessagingOptions {
            mode: MessagingMode::Demo,
            twilio: None,
            transport_timeout: Duration::from_secs(1),
        })
        .unwrap();
        assert_eq!(state.mode().await, MessagingMode::Demo);
        state.set_mode(MessagingMode::Live).await;
        assert_eq!(state.mode().await, MessagingMode::Live);
    }

    #[tokio::test]
    async fn live_mode_without_credentials_uses_demo_transport() {
        let state = MessagingState::new(MessagingOptions {
            mode: MessagingMode::Live,
            twilio: None,
            transport_timeout: Duration::from_secs(1),
        })
        .unwrap();
        // No Twilio transport configured, so the demo roll still answers.
        let result = state
            .transport_send(CommunicationKind::Sms, "+15551234567", "hello")
            .await;
        match result {
            Ok(id) => assert!(id.starts_with("demo-sms-")),
            Err(err) => assert!(matches!(err, TransportError::Simulated)),
        }
    }
}
