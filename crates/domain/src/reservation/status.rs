//! Reservation approval state machine.

use serde::{Deserialize, Serialize};

use crate::text_enum::text_enum;

/// The status of a reservation in its lifecycle.
///
/// State transitions:
/// ```text
/// Pending ──┬──► Approved ──► Cancelled
///           ├──► Rejected
///           └──► Cancelled
/// ```
///
/// `Rejected` and `Cancelled` are terminal. `Approved` is terminal with
/// respect to review but can still be cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    /// Submitted and awaiting review. Holds resources under the soft-hold policy.
    #[default]
    Pending,

    /// Accepted by a reviewer.
    Approved,

    /// Declined by a reviewer (terminal state).
    Rejected,

    /// Withdrawn by the requester or an administrator (terminal state).
    Cancelled,
}

text_enum!(ReservationStatus, "reservation status" {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
    Cancelled => "cancelled",
});

impl ReservationStatus {
    pub fn can_approve(&self) -> bool {
        matches!(self, ReservationStatus::Pending)
    }

    pub fn can_reject(&self) -> bool {
        matches!(self, ReservationStatus::Pending)
    }

    pub fn can_cancel(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Pending | ReservationStatus::Approved
        )
    }

    /// Window, motive and element lines may only change while pending.
    pub fn can_amend(&self) -> bool {
        matches!(self, ReservationStatus::Pending)
    }

    /// Returns true for the statuses that may hold space-time and stock.
    pub fn holds_resources(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Pending | ReservationStatus::Approved
        )
    }

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Rejected | ReservationStatus::Cancelled
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_pending() {
        assert_eq!(ReservationStatus::default(), ReservationStatus::Pending);
    }

    #[test]
    fn test_only_pending_can_be_reviewed() {
        assert!(ReservationStatus::Pending.can_approve());
        assert!(ReservationStatus::Pending.can_reject());
        for status in [
            ReservationStatus::Approved,
            ReservationStatus::Rejected,
            ReservationStatus::Cancelled,
        ] {
            assert!(!status.can_approve());
            assert!(!status.can_reject());
            assert!(!status.can_amend());
        }
    }

    #[test]
    fn test_cancel_from_pending_and_approved() {
        assert!(ReservationStatus::Pending.can_cancel());
        assert!(ReservationStatus::Approved.can_cancel());
        assert!(!ReservationStatus::Rejected.can_cancel());
        assert!(!ReservationStatus::Cancelled.can_cancel());
    }

    #[test]
    fn test_terminal_statuses_release_resources() {
        for status in [ReservationStatus::Rejected, ReservationStatus::Cancelled] {
            assert!(status.is_terminal());
            assert!(!status.holds_resources());
        }
        assert!(ReservationStatus::Pending.holds_resources());
        assert!(ReservationStatus::Approved.holds_resources());
        assert!(!ReservationStatus::Approved.is_terminal());
    }

    #[test]
    fn test_text_round_trip() {
        assert_eq!(ReservationStatus::Cancelled.to_string(), "cancelled");
        assert_eq!(
            "approved".parse::<ReservationStatus>().unwrap(),
            ReservationStatus::Approved
        );
        assert_eq!(
            serde_json::to_string(&ReservationStatus::Pending).unwrap(),
            "\"pending\""
        );
    }
}
