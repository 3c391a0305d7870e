//! Reservation aggregate implementation.

use chrono::{DateTime, NaiveDate, Utc};
use common::{ElementId, ReservationId, SpaceId, UserId, Version};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::policy::SubmissionRules;
use crate::role::{Actor, Role};
use crate::window::TimeWindow;

use super::{
    Amendment, ElementLine, ReservationDraft, ReservationError, ReservationEvent,
    ReservationEventKind, ReservationRef, ReservationStatus,
    events::{AmendedData, CancelledData, RejectedData, SubmittedData},
    validate_lines,
};

/// Reservation aggregate root.
///
/// A request by one user to occupy one space during one time window,
/// optionally borrowing quantities of elements. Commands validate against
/// the current status and return the event that would record the change;
/// `apply` folds that event into the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    id: ReservationId,
    space_id: SpaceId,
    requester_id: UserId,
    window: TimeWindow,
    motive: String,
    status: ReservationStatus,
    #[serde(default)]
    rejection_reason: Option<String>,
    #[serde(default)]
    lines: Vec<ElementLine>,
    #[serde(default)]
    reviewed_by: Option<UserId>,
    #[serde(default)]
    reviewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    cancelled_by: Option<UserId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,

    /// Number of events folded into this record.
    version: Version,
}

// Query methods
impl Reservation {
    pub fn id(&self) -> ReservationId {
        self.id
    }

    pub fn space_id(&self) -> SpaceId {
        self.space_id
    }

    pub fn requester_id(&self) -> UserId {
        self.requester_id
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    pub fn date(&self) -> NaiveDate {
        self.window.date()
    }

    pub fn motive(&self) -> &str {
        &self.motive
    }

    pub fn status(&self) -> ReservationStatus {
        self.status
    }

    /// Set only once the reservation has been rejected.
    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }

    pub fn lines(&self) -> &[ElementLine] {
        &self.lines
    }

    pub fn reviewed_by(&self) -> Option<UserId> {
        self.reviewed_by
    }

    pub fn reviewed_at(&self) -> Option<DateTime<Utc>> {
        self.reviewed_at
    }

    pub fn cancelled_by(&self) -> Option<UserId> {
        self.cancelled_by
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Units of `element_id` requested by this reservation, 0 if none.
    pub fn quantity_of(&self, element_id: ElementId) -> u32 {
        self.lines
            .iter()
            .find(|line| line.element_id == element_id)
            .map_or(0, |line| line.quantity)
    }

    pub fn uses_element(&self, element_id: ElementId) -> bool {
        self.lines.iter().any(|line| line.element_id == element_id)
    }

    pub fn element_ids(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.lines.iter().map(|line| line.element_id)
    }

    /// Requesters see their own reservations; reviewers see everything.
    pub fn is_visible_to(&self, actor: &Actor) -> bool {
        actor.role.sees_all_reservations() || actor.is(self.requester_id)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn to_ref(&self) -> ReservationRef {
        ReservationRef {
            id: self.id,
            space_id: self.space_id,
            requester_id: self.requester_id,
            window: self.window,
            status: self.status,
        }
    }
}

// Command methods (return events)
impl Reservation {
    /// Validates a draft and returns the new pending reservation together
    /// with its `Submitted` event.
    ///
    /// Only input rules are checked here. Availability and stock depend on
    /// the rest of the schedule and are checked by the caller.
    pub fn submit(
        draft: ReservationDraft,
        rules: &SubmissionRules,
        today: NaiveDate,
        at: DateTime<Utc>,
    ) -> Result<(Self, ReservationEvent), ValidationError> {
        rules.check_date(draft.window.date(), today)?;
        rules.check_motive(&draft.motive)?;
        validate_lines(&draft.lines)?;

        let data = SubmittedData {
            space_id: draft.space_id,
            requester_id: draft.requester_id,
            window: draft.window,
            motive: draft.motive.trim().to_string(),
            lines: draft.lines,
        };
        let id = ReservationId::new();
        let reservation = Self::created(id, &data, at);
        let event = ReservationEvent {
            reservation_id: id,
            sequence: reservation.version,
            actor: data.requester_id,
            occurred_at: at,
            kind: ReservationEventKind::Submitted(data),
        };

        Ok((reservation, event))
    }

    /// Approves a pending reservation.
    pub fn approve(
        &self,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> Result<ReservationEvent, ReservationError> {
        if !actor.role.can_review() {
            return Err(ReservationError::Forbidden {
                role: actor.role,
                action: "approve",
            });
        }

        if !self.status.can_approve() {
            return Err(ReservationError::IllegalTransition {
                current: self.status,
                action: "approve",
            });
        }

        Ok(self.next_event(actor.user_id, at, ReservationEventKind::Approved))
    }

    /// Rejects a pending reservation. The reason must not be blank.
    pub fn reject(
        &self,
        actor: &Actor,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<ReservationEvent, ReservationError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ValidationError::MissingReason.into());
        }

        if !actor.role.can_review() {
            return Err(ReservationError::Forbidden {
                role: actor.role,
                action: "reject",
            });
        }

        if !self.status.can_reject() {
            return Err(ReservationError::IllegalTransition {
                current: self.status,
                action: "reject",
            });
        }

        Ok(self.next_event(
            actor.user_id,
            at,
            ReservationEventKind::Rejected(RejectedData {
                reason: reason.to_string(),
            }),
        ))
    }

    /// Cancels a pending or approved reservation.
    ///
    /// The requester may always cancel their own reservation. An
    /// administrator may cancel anyone's pending reservation, but cancelling
    /// someone else's approved reservation requires `force`. `force` has no
    /// effect for any other role.
    pub fn cancel(
        &self,
        actor: &Actor,
        force: bool,
        at: DateTime<Utc>,
    ) -> Result<ReservationEvent, ReservationError> {
        let is_owner = actor.is(self.requester_id);
        if !is_owner && !actor.role.can_force_cancel() {
            return Err(ReservationError::Forbidden {
                role: actor.role,
                action: "cancel",
            });
        }

        if !self.status.can_cancel() {
            return Err(ReservationError::IllegalTransition {
                current: self.status,
                action: "cancel",
            });
        }

        let forced = !is_owner && self.status == ReservationStatus::Approved;
        if forced && !force {
            return Err(ReservationError::Forbidden {
                role: actor.role,
                action: "cancel an approved reservation without force",
            });
        }

        Ok(self.next_event(
            actor.user_id,
            at,
            ReservationEventKind::Cancelled(CancelledData { forced }),
        ))
    }

    /// Edits the window, motive or element lines of a pending reservation.
    ///
    /// The returned event carries the full resulting values. The caller must
    /// re-validate availability and stock against the new values.
    pub fn amend(
        &self,
        actor: &Actor,
        amendment: Amendment,
        rules: &SubmissionRules,
        today: NaiveDate,
        at: DateTime<Utc>,
    ) -> Result<ReservationEvent, ReservationError> {
        if !actor.is(self.requester_id) && actor.role != Role::Admin {
            return Err(ReservationError::Forbidden {
                role: actor.role,
                action: "amend",
            });
        }

        if !self.status.can_amend() {
            return Err(ReservationError::IllegalTransition {
                current: self.status,
                action: "amend",
            });
        }

        if amendment.is_empty() {
            return Err(ValidationError::EmptyAmendment.into());
        }

        if let Some(window) = amendment.window {
            rules.check_date(window.date(), today)?;
        }
        let motive = match amendment.motive {
            Some(motive) => {
                rules.check_motive(&motive)?;
                motive.trim().to_string()
            }
            None => self.motive.clone(),
        };
        let lines = match amendment.lines {
            Some(lines) => {
                validate_lines(&lines)?;
                lines
            }
            None => self.lines.clone(),
        };

        Ok(self.next_event(
            actor.user_id,
            at,
            ReservationEventKind::Amended(AmendedData {
                window: amendment.window.unwrap_or(self.window),
                motive,
                lines,
            }),
        ))
    }

    fn next_event(
        &self,
        actor: UserId,
        at: DateTime<Utc>,
        kind: ReservationEventKind,
    ) -> ReservationEvent {
        ReservationEvent {
            reservation_id: self.id,
            sequence: self.version.next(),
            actor,
            occurred_at: at,
            kind,
        }
    }
}

// Event application
impl Reservation {
    /// Folds an event produced by one of the command methods into the record.
    pub fn apply(&mut self, event: &ReservationEvent) {
        match &event.kind {
            ReservationEventKind::Submitted(_) => {
                // Only valid as the first event; handled by `from_events`.
            }
            ReservationEventKind::Amended(data) => {
                self.window = data.window;
                self.motive = data.motive.clone();
                self.lines = data.lines.clone();
            }
            ReservationEventKind::Approved => {
                self.status = ReservationStatus::Approved;
                self.reviewed_by = Some(event.actor);
                self.reviewed_at = Some(event.occurred_at);
            }
            ReservationEventKind::Rejected(data) => {
                self.status = ReservationStatus::Rejected;
                self.rejection_reason = Some(data.reason.clone());
                self.reviewed_by = Some(event.actor);
                self.reviewed_at = Some(event.occurred_at);
            }
            ReservationEventKind::Cancelled(_) => {
                self.status = ReservationStatus::Cancelled;
                self.cancelled_by = Some(event.actor);
            }
        }
        self.version = event.sequence;
        self.updated_at = event.occurred_at;
    }

    /// Rebuilds a reservation from its full history.
    ///
    /// Returns `None` if the history is empty or does not start with a
    /// `Submitted` event.
    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a ReservationEvent>) -> Option<Self> {
        let mut events = events.into_iter();
        let first = events.next()?;
        let ReservationEventKind::Submitted(data) = &first.kind else {
            return None;
        };

        let mut reservation = Self::created(first.reservation_id, data, first.occurred_at);
        for event in events {
            reservation.apply(event);
        }
        Some(reservation)
    }

    fn created(id: ReservationId, data: &SubmittedData, at: DateTime<Utc>) -> Self {
        Self {
            id,
            space_id: data.space_id,
            requester_id: data.requester_id,
            window: data.window,
            motive: data.motive.clone(),
            status: ReservationStatus::Pending,
            rejection_reason: None,
            lines: data.lines.clone(),
            reviewed_by: None,
            reviewed_at: None,
            cancelled_by: None,
            created_at: at,
            updated_at: at,
            version: Version::first(),
        }
    }
}
