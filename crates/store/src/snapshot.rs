use domain::{Element, Reservation, Space};

use crate::LedgerStamp;

/// A consistent read of one space-day and the element-days a request touches.
///
/// `reservations` holds every pending or approved reservation on the date
/// that uses the space or any of the requested elements. The validators
/// apply the hold policy and exclusions on top of this set.
#[derive(Debug, Clone)]
pub struct ScheduleSnapshot {
    pub space: Space,
    pub elements: Vec<Element>,
    pub reservations: Vec<Reservation>,
    pub stamp: LedgerStamp,
}
