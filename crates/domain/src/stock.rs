//! Stock Allocator: element quantities over overlapping windows.

use common::{ElementId, ReservationId};
use serde::{Deserialize, Serialize};

use crate::catalog::{Element, ElementStatus};
use crate::error::UnknownElement;
use crate::policy::HoldPolicy;
use crate::reservation::{ElementLine, Reservation};
use crate::window::TimeWindow;

/// One line that cannot be satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortfall {
    pub element_id: ElementId,
    pub requested: u32,
    /// Units left after counted holds; 0 when the element is not lendable.
    pub available: u32,
    pub element_status: ElementStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReport {
    pub sufficient: bool,
    pub shortfalls: Vec<Shortfall>,
}

/// Units of `element_id` held by counted reservations whose window overlaps
/// `window`.
///
/// Every overlapping hold is summed, even when two holds do not overlap each
/// other. This never under-counts the peak.
pub fn committed_quantity(
    element_id: ElementId,
    window: &TimeWindow,
    reservations: &[Reservation],
    excluding: Option<ReservationId>,
    policy: HoldPolicy,
) -> u32 {
    reservations
        .iter()
        .filter(|r| Some(r.id()) != excluding)
        .filter(|r| policy.counts(r.status()))
        .filter(|r| r.window().overlaps(window))
        .map(|r| r.quantity_of(element_id))
        .fold(0u32, u32::saturating_add)
}

/// Checks every line against the elements' stock and status.
///
/// Returns every shortfall rather than stopping at the first one. Fails if a
/// line names an element missing from `elements`.
pub fn check_stock(
    lines: &[ElementLine],
    window: &TimeWindow,
    elements: &[Element],
    reservations: &[Reservation],
    excluding: Option<ReservationId>,
    policy: HoldPolicy,
) -> Result<StockReport, UnknownElement> {
    let mut shortfalls = Vec::new();

    for line in lines {
        let element = elements
            .iter()
            .find(|e| e.id == line.element_id)
            .ok_or(UnknownElement(line.element_id))?;

        let available = if element.status.is_lendable() {
            let committed =
                committed_quantity(element.id, window, reservations, excluding, policy);
            element.stock_total.saturating_sub(committed)
        } else {
            0
        };

        if !element.status.is_lendable() || line.quantity > available {
            shortfalls.push(Shortfall {
                element_id: element.id,
                requested: line.quantity,
                available,
                element_status: element.status,
            });
        }
    }

    Ok(StockReport {
        sufficient: shortfalls.is_empty(),
        shortfalls,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use common::{SpaceId, UserId};

    use super::*;
    use crate::catalog::ElementCategory;
    use crate::policy::SubmissionRules;
    use crate::reservation::ReservationDraft;
    use crate::role::{Actor, Role};

    fn date() -> NaiveDate {
        "2025-11-10".parse().unwrap()
    }

    fn window(start: &str, end: &str) -> TimeWindow {
        TimeWindow::new(date(), start.parse().unwrap(), end.parse().unwrap()).unwrap()
    }

    fn projector() -> Element {
        Element::new("Projector", ElementCategory::Technology, 3).unwrap()
    }

    fn holding(element: &Element, quantity: u32, start: &str, end: &str) -> Reservation {
        let draft = ReservationDraft {
            space_id: SpaceId::new(),
            requester_id: UserId::new(),
            window: window(start, end),
            motive: "Thesis defense rehearsal".to_string(),
            lines: vec![ElementLine::new(element.id, quantity)],
        };
        Reservation::submit(draft, &SubmissionRules::default(), date(), Utc::now())
            .unwrap()
            .0
    }

    #[test]
    fn committed_counts_only_overlapping_holds() {
        let projector = projector();
        let schedule = vec![
            holding(&projector, 2, "10:00:00", "12:00:00"),
            holding(&projector, 1, "12:00:00", "13:00:00"),
        ];
        assert_eq!(
            committed_quantity(
                projector.id,
                &window("11:00:00", "11:30:00"),
                &schedule,
                None,
                HoldPolicy::Soft
            ),
            2
        );
        assert_eq!(
            committed_quantity(
                projector.id,
                &window("11:00:00", "12:30:00"),
                &schedule,
                None,
                HoldPolicy::Soft
            ),
            3
        );
    }

    #[test]
    fn shortfall_reports_available_and_requested() {
        let projector = projector();
        let schedule = vec![holding(&projector, 2, "10:00:00", "12:00:00")];
        let report = check_stock(
            &[ElementLine::new(projector.id, 2)],
            &window("10:00:00", "12:00:00"),
            std::slice::from_ref(&projector),
            &schedule,
            None,
            HoldPolicy::Soft,
        )
        .unwrap();

        assert!(!report.sufficient);
        assert_eq!(
            report.shortfalls,
            vec![Shortfall {
                element_id: projector.id,
                requested: 2,
                available: 1,
                element_status: ElementStatus::Available,
            }]
        );
    }

    #[test]
    fn exact_fit_is_sufficient() {
        let projector = projector();
        let schedule = vec![holding(&projector, 2, "10:00:00", "12:00:00")];
        let report = check_stock(
            &[ElementLine::new(projector.id, 1)],
            &window("10:00:00", "12:00:00"),
            std::slice::from_ref(&projector),
            &schedule,
            None,
            HoldPolicy::Soft,
        )
        .unwrap();
        assert!(report.sufficient);
    }

    #[test]
    fn excluded_reservation_releases_its_own_hold() {
        let projector = projector();
        let own = holding(&projector, 3, "10:00:00", "12:00:00");
        let report = check_stock(
            own.lines(),
            &own.window(),
            std::slice::from_ref(&projector),
            std::slice::from_ref(&own),
            Some(own.id()),
            HoldPolicy::Soft,
        )
        .unwrap();
        assert!(report.sufficient);
    }

    #[test]
    fn cancelled_holds_do_not_count() {
        let projector = projector();
        let mut held = holding(&projector, 3, "10:00:00", "12:00:00");
        let owner = Actor::new(held.requester_id(), Role::Requester);
        let event = held.cancel(&owner, false, Utc::now()).unwrap();
        held.apply(&event);

        assert_eq!(
            committed_quantity(
                projector.id,
                &held.window(),
                std::slice::from_ref(&held),
                None,
                HoldPolicy::Soft
            ),
            0
        );
    }

    #[test]
    fn element_out_of_service_is_a_shortfall() {
        let projector = projector().with_status(ElementStatus::Maintenance);
        let report = check_stock(
            &[ElementLine::new(projector.id, 1)],
            &window("10:00:00", "12:00:00"),
            std::slice::from_ref(&projector),
            &[],
            None,
            HoldPolicy::Soft,
        )
        .unwrap();
        assert!(!report.sufficient);
        assert_eq!(report.shortfalls[0].available, 0);
        assert_eq!(report.shortfalls[0].element_status, ElementStatus::Maintenance);
    }

    #[test]
    fn unknown_element_is_an_error() {
        let missing = ElementId::new();
        let err = check_stock(
            &[ElementLine::new(missing, 1)],
            &window("10:00:00", "12:00:00"),
            &[projector()],
            &[],
            None,
            HoldPolicy::Soft,
        )
        .unwrap_err();
        assert_eq!(err, UnknownElement(missing));
    }

    #[test]
    fn every_shortfall_is_reported() {
        let projector = projector();
        let microphone = Element::new("Microphone", ElementCategory::Audio, 1).unwrap();
        let report = check_stock(
            &[
                ElementLine::new(projector.id, 4),
                ElementLine::new(microphone.id, 2),
            ],
            &window("10:00:00", "12:00:00"),
            &[projector, microphone],
            &[],
            None,
            HoldPolicy::Soft,
        )
        .unwrap();
        assert_eq!(report.shortfalls.len(), 2);
    }
}
