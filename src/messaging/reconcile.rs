//! Delivery status reconciliation for asynchronous provider callbacks.

use sqlx::PgPool;
use tracing::{info, warn};

use super::status::{map_transport_status, CommunicationStatus};

/// What a reconciliation attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The row moved to the mapped status.
    Updated(CommunicationStatus),
    /// The row exists but is already terminal; the callback was a no-op.
    AlreadyFinal,
    /// No communication carries this transport id.
    UnknownId,
    /// The provider vocabulary is not one we track.
    Ignored,
}

// The guard on non-terminal status is what makes stale and duplicate
// callbacks no-ops; it must list every terminal status.
const RECONCILE_UPDATE: &str = r"
    UPDATE communications
    SET status = $2,
        sent_at = CASE WHEN $2 = 'SENT' AND sent_at IS NULL THEN NOW() ELSE sent_at END,
        delivered_at = CASE WHEN $2 = 'DELIVERED' THEN NOW() ELSE delivered_at END,
        failed_at = CASE WHEN $2 IN ('FAILED', 'CANCELLED') THEN NOW() ELSE failed_at END
    WHERE transport_message_id = $1
      AND status NOT IN ('DELIVERED', 'FAILED', 'CANCELLED')
";

/// Apply a provider status callback to the matching communication row.
///
/// The update is a single conditional statement guarded on non-terminal
/// status, so stale or duplicate callbacks can never regress a terminal row
/// even when they race with each other.
///
/// # Errors
/// Returns database errors only; unknown ids and stale callbacks are normal
/// outcomes.
pub async fn reconcile(
    pool: &PgPool,
    transport_id: &str,
    raw_status: &str,
) -> Result<ReconcileOutcome, sqlx::Error> {
    let Some(status) = map_transport_status(raw_status) else {
        info!(transport_id = %transport_id, status = %raw_status, "ignoring untracked transport status");
        return Ok(ReconcileOutcome::Ignored);
    };

    let result = sqlx::query(RECONCILE_UPDATE)
        .bind(transport_id)
        .bind(status.as_str())
        .execute(pool)
        .await?;

    if result.rows_affected() > 0 {
        info!(transport_id = %transport_id, status = %status, "communication status reconciled");
        return Ok(ReconcileOutcome::Updated(status));
    }

    let exists = sqlx::query("SELECT 1 FROM communications WHERE transport_message_id = $1")
        .bind(transport_id)
        .fetch_optional(pool)
        .await?
        .is_some();

    if exists {
        info!(transport_id = %transport_id, status = %status, "callback for terminal communication skipped");
        Ok(ReconcileOutcome::AlreadyFinal)
    } else {
        warn!(transport_id = %transport_id, "callback for unknown transport id");
        Ok(ReconcileOutcome::UnknownId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Rows that reached a terminal status must never move again, even when a
    // delivered callback races a failed one for the same transport id.
    #[test]
    fn update_excludes_every_terminal_status() {
        let guard = "status NOT IN ('DELIVERED', 'FAILED', 'CANCELLED')";
        assert!(RECONCILE_UPDATE.contains(guard));

        for status in [
            CommunicationStatus::Delivered,
            CommunicationStatus::Failed,
            CommunicationStatus::Cancelled,
        ] {
            assert!(status.is_terminal());
            assert!(RECONCILE_UPDATE.contains(&format!("'{}'", status.as_str())));
        }
    }

    #[test]
    fn update_is_keyed_on_the_transport_id() {
        assert!(RECONCILE_UPDATE.contains("WHERE transport_message_id = $1"));
    }
}
