use async_trait::async_trait;
use chrono::NaiveDate;
use common::{ElementId, ReservationId, SpaceId, Version};
use domain::{Element, Reservation, ReservationEvent, ReservationEventKind, Space};

use crate::{LedgerKey, LedgerStamp, ReservationQuery, Result, ScheduleSnapshot, StoreError};

/// Space and element definitions.
///
/// Read-mostly: the reservation core only reads from it. Writes come from
/// catalog administration and seeding.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Inserts or replaces a space after validating it.
    async fn put_space(&self, space: Space) -> Result<()>;

    async fn get_space(&self, space_id: SpaceId) -> Result<Option<Space>>;

    /// All spaces ordered by name.
    async fn list_spaces(&self) -> Result<Vec<Space>>;

    /// Fails with `SpaceInUse` while any reservation references the space.
    async fn delete_space(&self, space_id: SpaceId) -> Result<()>;

    /// Inserts or replaces an element after validating it.
    async fn put_element(&self, element: Element) -> Result<()>;

    async fn get_element(&self, element_id: ElementId) -> Result<Option<Element>>;

    /// All elements ordered by name.
    async fn list_elements(&self) -> Result<Vec<Element>>;

    /// Fails with `ElementInUse` while any reservation line references the element.
    async fn delete_element(&self, element_id: ElementId) -> Result<()>;
}

/// Durable store of reservations, their history, and the schedule ledger.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Materializes the schedule needed to validate a request for
    /// `space_id` on `date` using `element_ids`, together with the ledger
    /// stamp that guards it.
    ///
    /// Fails with `SpaceNotFound` or `ElementNotFound` for unknown ids.
    async fn load_snapshot(
        &self,
        space_id: SpaceId,
        date: NaiveDate,
        element_ids: &[ElementId],
    ) -> Result<ScheduleSnapshot>;

    /// Persists a new reservation and its `Submitted` event.
    ///
    /// Every key in `stamp` must still be at the stamped version; all of
    /// them are bumped atomically with the insert. Otherwise nothing is
    /// written and `ConcurrencyConflict` is returned.
    async fn insert(
        &self,
        reservation: &Reservation,
        event: &ReservationEvent,
        stamp: &LedgerStamp,
    ) -> Result<()>;

    /// Replaces a reservation with the result of applying `event`.
    ///
    /// The stored record must be at the version preceding `event.sequence`
    /// (`VersionConflict` otherwise) and `stamp` is verified and bumped as
    /// for `insert`. Writes that only release holds pass an empty stamp.
    async fn update(
        &self,
        reservation: &Reservation,
        event: &ReservationEvent,
        stamp: &LedgerStamp,
    ) -> Result<()>;

    async fn get(&self, reservation_id: ReservationId) -> Result<Option<Reservation>>;

    async fn list(&self, query: ReservationQuery) -> Result<Vec<Reservation>>;

    /// Events of one reservation in sequence order.
    async fn history(&self, reservation_id: ReservationId) -> Result<Vec<ReservationEvent>>;
}

/// Checks that `event` is the change that produced `reservation`.
pub fn validate_write(reservation: &Reservation, event: &ReservationEvent) -> Result<()> {
    if event.reservation_id != reservation.id() {
        return Err(StoreError::InvalidWrite(format!(
            "event for {} does not belong to reservation {}",
            event.reservation_id,
            reservation.id()
        )));
    }
    if event.sequence != reservation.version() {
        return Err(StoreError::InvalidWrite(format!(
            "event sequence {} does not match record version {}",
            event.sequence,
            reservation.version()
        )));
    }
    Ok(())
}

/// Checks that an insert carries the first event of a new reservation.
pub fn validate_insert(reservation: &Reservation, event: &ReservationEvent) -> Result<()> {
    validate_write(reservation, event)?;
    if event.sequence != Version::first()
        || !matches!(event.kind, ReservationEventKind::Submitted(_))
    {
        return Err(StoreError::InvalidWrite(
            "a new reservation must start with its Submitted event".to_string(),
        ));
    }
    Ok(())
}

/// Version the stored record must have for `event` to apply.
pub(crate) fn expected_prior(event: &ReservationEvent) -> Version {
    Version::new(event.sequence.as_i64() - 1)
}

/// Ledger keys occupied by a reservation's current values.
pub(crate) fn occupied_keys(reservation: &Reservation) -> Vec<LedgerKey> {
    LedgerKey::for_schedule(
        reservation.space_id(),
        reservation.date(),
        reservation.element_ids(),
    )
}

/// Fails if a hold-adding write is not guarded by its stamp.
///
/// A write that leaves the record holding resources must carry a stamp
/// covering every key the record occupies.
pub(crate) fn validate_guard(
    reservation: &Reservation,
    event: &ReservationEvent,
    stamp: &LedgerStamp,
) -> Result<()> {
    let adds_hold = matches!(
        event.kind,
        ReservationEventKind::Submitted(_)
            | ReservationEventKind::Amended(_)
            | ReservationEventKind::Approved
    );
    if !adds_hold {
        return Ok(());
    }
    if let Some(key) = occupied_keys(reservation)
        .into_iter()
        .find(|key| !stamp.covers(key))
    {
        return Err(StoreError::InvalidWrite(format!(
            "{} is not guarded by the write's ledger stamp",
            key
        )));
    }
    Ok(())
}
