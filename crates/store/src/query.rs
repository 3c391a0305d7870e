use chrono::NaiveDate;
use common::{SpaceId, UserId};
use domain::{Reservation, ReservationStatus};
use serde::{Deserialize, Serialize};

/// Builder for reservation listings.
///
/// Results are always ordered by date, then start time, then creation time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationQuery {
    /// Filter by space.
    pub space_id: Option<SpaceId>,

    /// Filter by requester.
    pub requester_id: Option<UserId>,

    /// Filter by status (any of these).
    pub statuses: Option<Vec<ReservationStatus>>,

    /// Reservations on or after this date.
    pub from_date: Option<NaiveDate>,

    /// Reservations on or before this date.
    pub to_date: Option<NaiveDate>,

    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ReservationQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_space(space_id: SpaceId) -> Self {
        Self {
            space_id: Some(space_id),
            ..Default::default()
        }
    }

    pub fn for_requester(requester_id: UserId) -> Self {
        Self {
            requester_id: Some(requester_id),
            ..Default::default()
        }
    }

    pub fn space(mut self, space_id: SpaceId) -> Self {
        self.space_id = Some(space_id);
        self
    }

    pub fn requester(mut self, requester_id: UserId) -> Self {
        self.requester_id = Some(requester_id);
        self
    }

    pub fn status(mut self, status: ReservationStatus) -> Self {
        self.statuses = Some(vec![status]);
        self
    }

    pub fn statuses(mut self, statuses: Vec<ReservationStatus>) -> Self {
        self.statuses = Some(statuses);
        self
    }

    pub fn from_date(mut self, date: NaiveDate) -> Self {
        self.from_date = Some(date);
        self
    }

    pub fn to_date(mut self, date: NaiveDate) -> Self {
        self.to_date = Some(date);
        self
    }

    /// Restricts to a single date.
    pub fn on(self, date: NaiveDate) -> Self {
        self.from_date(date).to_date(date)
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if `reservation` passes every filter. Paging is not
    /// considered.
    pub fn matches(&self, reservation: &Reservation) -> bool {
        if let Some(space_id) = self.space_id
            && reservation.space_id() != space_id
        {
            return false;
        }
        if let Some(requester_id) = self.requester_id
            && reservation.requester_id() != requester_id
        {
            return false;
        }
        if let Some(ref statuses) = self.statuses
            && !statuses.contains(&reservation.status())
        {
            return false;
        }
        if let Some(from) = self.from_date
            && reservation.date() < from
        {
            return false;
        }
        if let Some(to) = self.to_date
            && reservation.date() > to
        {
            return false;
        }
        true
    }
}

/// Listing order shared by every store implementation.
pub(crate) fn listing_order(a: &Reservation, b: &Reservation) -> std::cmp::Ordering {
    (a.date(), a.window().start(), a.created_at()).cmp(&(
        b.date(),
        b.window().start(),
        b.created_at(),
    ))
}
