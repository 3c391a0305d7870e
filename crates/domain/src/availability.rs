//! Availability Validator: space-time conflicts.

use common::ReservationId;
use serde::{Deserialize, Serialize};

use crate::catalog::{Space, SpaceStatus};
use crate::policy::HoldPolicy;
use crate::reservation::{Reservation, ReservationRef};
use crate::window::TimeWindow;

/// Outcome of an availability check.
///
/// `available` is false either because the space does not accept
/// reservations (`space_status`, with no conflicts listed) or because of
/// overlapping holds (`conflicts`, never empty in that case).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityReport {
    pub available: bool,
    pub space_status: SpaceStatus,
    pub conflicts: Vec<ReservationRef>,
}

impl AvailabilityReport {
    pub fn space_unavailable(&self) -> bool {
        !self.space_status.accepts_reservations()
    }
}

/// Checks whether `window` is free on `space`.
///
/// `reservations` is the materialized schedule of the window's date; only
/// records for this space whose status counts under `policy` are considered,
/// and `excluding` removes the reservation being re-evaluated.
/// Conflicts are returned sorted by start time.
pub fn check_availability(
    space: &Space,
    window: &TimeWindow,
    reservations: &[Reservation],
    excluding: Option<ReservationId>,
    policy: HoldPolicy,
) -> AvailabilityReport {
    if !space.status.accepts_reservations() {
        return AvailabilityReport {
            available: false,
            space_status: space.status,
            conflicts: Vec::new(),
        };
    }

    let mut conflicts: Vec<ReservationRef> = reservations
        .iter()
        .filter(|r| r.space_id() == space.id)
        .filter(|r| Some(r.id()) != excluding)
        .filter(|r| policy.counts(r.status()))
        .filter(|r| r.window().overlaps(window))
        .map(Reservation::to_ref)
        .collect();
    conflicts.sort_by_key(|c| (c.window.start(), c.window.end()));

    AvailabilityReport {
        available: conflicts.is_empty(),
        space_status: space.status,
        conflicts,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use common::UserId;

    use super::*;
    use crate::catalog::SpaceKind;
    use crate::policy::SubmissionRules;
    use crate::reservation::{ReservationDraft, ReservationStatus};
    use crate::role::{Actor, Role};

    fn date() -> NaiveDate {
        "2025-11-10".parse().unwrap()
    }

    fn window(start: &str, end: &str) -> TimeWindow {
        TimeWindow::new(date(), start.parse().unwrap(), end.parse().unwrap()).unwrap()
    }

    fn space() -> Space {
        Space::new("Room 101", SpaceKind::Classroom, 20, "Block A").unwrap()
    }

    fn reserve(space: &Space, start: &str, end: &str) -> Reservation {
        let draft = ReservationDraft {
            space_id: space.id,
            requester_id: UserId::new(),
            window: window(start, end),
            motive: "Weekly seminar meeting".to_string(),
            lines: Vec::new(),
        };
        Reservation::submit(draft, &SubmissionRules::default(), date(), Utc::now())
            .unwrap()
            .0
    }

    fn approve(mut reservation: Reservation) -> Reservation {
        let actor = Actor::new(UserId::new(), Role::Coordinator);
        let event = reservation.approve(&actor, Utc::now()).unwrap();
        reservation.apply(&event);
        reservation
    }

    #[test]
    fn free_window_is_available() {
        let space = space();
        let schedule = vec![reserve(&space, "08:00:00", "10:00:00")];
        let report = check_availability(
            &space,
            &window("10:00:00", "12:00:00"),
            &schedule,
            None,
            HoldPolicy::Soft,
        );
        assert!(report.available);
        assert!(report.conflicts.is_empty());
    }

    #[test]
    fn lists_every_conflict_in_start_order() {
        let space = space();
        let late = reserve(&space, "11:30:00", "13:00:00");
        let early = reserve(&space, "09:00:00", "10:30:00");
        let schedule = vec![late.clone(), early.clone()];

        let report = check_availability(
            &space,
            &window("10:00:00", "12:00:00"),
            &schedule,
            None,
            HoldPolicy::Soft,
        );
        assert!(!report.available);
        assert!(!report.space_unavailable());
        let ids: Vec<_> = report.conflicts.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![early.id(), late.id()]);
    }

    #[test]
    fn excluded_reservation_does_not_conflict_with_itself() {
        let space = space();
        let own = reserve(&space, "10:00:00", "12:00:00");
        let schedule = vec![own.clone()];
        let report = check_availability(
            &space,
            &own.window(),
            &schedule,
            Some(own.id()),
            HoldPolicy::Soft,
        );
        assert!(report.available);
    }

    #[test]
    fn other_spaces_are_ignored() {
        let space = space();
        let other = Space::new("Room 102", SpaceKind::Classroom, 20, "Block A").unwrap();
        let schedule = vec![reserve(&other, "10:00:00", "12:00:00")];
        let report = check_availability(
            &space,
            &window("10:00:00", "12:00:00"),
            &schedule,
            None,
            HoldPolicy::Soft,
        );
        assert!(report.available);
    }

    #[test]
    fn hard_hold_ignores_pending() {
        let space = space();
        let pending = reserve(&space, "10:00:00", "12:00:00");
        let approved = approve(reserve(&space, "12:00:00", "14:00:00"));
        let schedule = vec![pending, approved.clone()];

        let report = check_availability(
            &space,
            &window("11:00:00", "13:00:00"),
            &schedule,
            None,
            HoldPolicy::Hard,
        );
        assert_eq!(report.conflicts.len(), 1);
        assert_eq!(report.conflicts[0].id, approved.id());
        assert_eq!(report.conflicts[0].status, ReservationStatus::Approved);
    }

    #[test]
    fn unavailable_space_reports_status_without_conflicts() {
        let space = space().with_status(SpaceStatus::Maintenance);
        let schedule = vec![reserve(&space, "10:00:00", "12:00:00")];
        let report = check_availability(
            &space,
            &window("10:00:00", "12:00:00"),
            &schedule,
            None,
            HoldPolicy::Soft,
        );
        assert!(!report.available);
        assert!(report.space_unavailable());
        assert_eq!(report.space_status, SpaceStatus::Maintenance);
        assert!(report.conflicts.is_empty());
    }
}
