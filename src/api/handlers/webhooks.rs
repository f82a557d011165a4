//! Provider status callbacks.
//!
//! Twilio posts form-encoded updates for both messages and calls. The
//! endpoint always answers 200 so the provider does not retry: unknown ids
//! and stale callbacks are logged outcomes, not errors.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Form, Json};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::messaging::{reconcile, ReconcileOutcome};

#[derive(Debug, Deserialize, ToSchema)]
pub struct TwilioCallback {
    #[serde(rename = "MessageSid")]
    pub message_sid: Option<String>,
    #[serde(rename = "CallSid")]
    pub call_sid: Option<String>,
    #[serde(rename = "MessageStatus")]
    pub message_status: Option<String>,
    #[serde(rename = "CallStatus")]
    pub call_status: Option<String>,
}

#[utoipa::path(
    post,
    path = "/webhooks/twilio",
    request_body(content = TwilioCallback, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Callback accepted."),
    ),
    tag = "webhooks"
)]
pub async fn twilio_status(
    pool: Extension<PgPool>,
    Form(callback): Form<TwilioCallback>,
) -> impl IntoResponse {
    let sid = callback.message_sid.or(callback.call_sid);
    let status = callback.message_status.or(callback.call_status);

    let (Some(sid), Some(status)) = (sid, status) else {
        warn!("provider callback missing sid or status");
        return (StatusCode::OK, Json(json!({ "received": true })));
    };

    match reconcile(&pool, &sid, &status).await {
        Ok(ReconcileOutcome::Updated(_) | ReconcileOutcome::AlreadyFinal) => {}
        Ok(ReconcileOutcome::UnknownId | ReconcileOutcome::Ignored) => {}
        Err(err) => {
            // Still 200: the provider retrying will not fix a database error.
            error!("failed to reconcile provider callback: {err}");
        }
    }

    (StatusCode::OK, Json(json!({ "received": true })))
}
