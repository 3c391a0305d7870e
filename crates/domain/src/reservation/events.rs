//! Reservation history events.
//!
//! Every write to a reservation is described by exactly one event. The
//! current record is the fold of its events, and the event list doubles as
//! the audit trail shown to reviewers.

use chrono::{DateTime, Utc};
use common::{ReservationId, SpaceId, UserId, Version};
use serde::{Deserialize, Serialize};

use crate::window::TimeWindow;

use super::ElementLine;

/// One entry in a reservation's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationEvent {
    pub reservation_id: ReservationId,

    /// Record version after this event; the first event has version 1.
    pub sequence: Version,

    /// Who triggered the change.
    pub actor: UserId,

    pub occurred_at: DateTime<Utc>,

    pub kind: ReservationEventKind,
}

impl ReservationEvent {
    pub fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ReservationEventKind {
    /// The reservation was submitted and is pending review.
    Submitted(SubmittedData),

    /// A pending reservation was edited.
    Amended(AmendedData),

    /// A reviewer approved the reservation.
    Approved,

    /// A reviewer rejected the reservation.
    Rejected(RejectedData),

    /// The requester or an administrator cancelled the reservation.
    Cancelled(CancelledData),
}

impl ReservationEventKind {
    pub fn event_type(&self) -> &'static str {
        match self {
            ReservationEventKind::Submitted(_) => "ReservationSubmitted",
            ReservationEventKind::Amended(_) => "ReservationAmended",
            ReservationEventKind::Approved => "ReservationApproved",
            ReservationEventKind::Rejected(_) => "ReservationRejected",
            ReservationEventKind::Cancelled(_) => "ReservationCancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedData {
    pub space_id: SpaceId,
    pub requester_id: UserId,
    pub window: TimeWindow,
    pub motive: String,
    pub lines: Vec<ElementLine>,
}

/// Full replacement values after an amendment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmendedData {
    pub window: TimeWindow,
    pub motive: String,
    pub lines: Vec<ElementLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedData {
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelledData {
    /// True when an administrator cancelled someone else's approved reservation.
    pub forced: bool,
}
