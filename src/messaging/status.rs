//! Communication status model and transport vocabulary mapping.

use std::fmt;
use std::str::FromStr;

/// Lifecycle of an outbound communication.
///
/// `DELIVERED`, `FAILED` and `CANCELLED` are terminal: once a row reaches one
/// of them, no further status update may change it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommunicationStatus {
    Pending,
    Sent,
    Delivered,
    Failed,
    Cancelled,
}

impl CommunicationStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Sent => "SENT",
            Self::Delivered => "DELIVERED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for CommunicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommunicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "SENT" => Ok(Self::Sent),
            "DELIVERED" => Ok(Self::Delivered),
            "FAILED" => Ok(Self::Failed),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(format!("unknown communication status: {other}")),
        }
    }
}

/// Map the provider's callback vocabulary to an internal status.
///
/// Returns `None` for statuses we do not track (the row stays as-is).
#[must_use]
pub fn map_transport_status(raw: &str) -> Option<CommunicationStatus> {
    match raw.trim().to_lowercase().as_str() {
        "sent" | "queued" | "sending" => Some(CommunicationStatus::Sent),
        "delivered" | "received" => Some(CommunicationStatus::Delivered),
        "failed" | "undelivered" => Some(CommunicationStatus::Failed),
        "cancelled" => Some(CommunicationStatus::Cancelled),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(!CommunicationStatus::Pending.is_terminal());
        assert!(!CommunicationStatus::Sent.is_terminal());
        assert!(CommunicationStatus::Delivered.is_terminal());
        assert!(CommunicationStatus::Failed.is_terminal());
        assert!(CommunicationStatus::Cancelled.is_terminal());
    }

    #[test]
    fn transport_vocabulary_maps() {
        assert_eq!(map_transport_status("queued"), Some(CommunicationStatus::Sent));
        assert_eq!(map_transport_status("sending"), Some(CommunicationStatus::Sent));
        assert_eq!(map_transport_status("sent"), Some(CommunicationStatus::Sent));
        assert_eq!(
            map_transport_status("delivered"),
            Some(CommunicationStatus::Delivered)
        );
        assert_eq!(
            map_transport_status("received"),
            Some(CommunicationStatus::Delivered)
        );
        assert_eq!(map_transport_status("failed"), Some(CommunicationStatus::Failed));
        assert_eq!(
            map_transport_status("undelivered"),
            Some(CommunicationStatus::Failed)
        );
        assert_eq!(
            map_transport_status("cancelled"),
            Some(CommunicationStatus::Cancelled)
        );
    }

    #[test]
    fn unknown_vocabulary_is_ignored() {
        assert_eq!(map_transport_status("accepted"), None);
        assert_eq!(map_transport_status(""), None);
    }

    #[test]
    fn mapping_is_case_insensitive() {
        assert_eq!(
            map_transport_status(" Delivered "),
            Some(CommunicationStatus::Delivered)
        );
    }

    #[test]
    fn round_trip_as_str() {
        for status in [
            CommunicationStatus::Pending,
            CommunicationStatus::Sent,
            CommunicationStatus::Delivered,
            CommunicationStatus::Failed,
            CommunicationStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<CommunicationStatus>(), Ok(status));
        }
    }
}
