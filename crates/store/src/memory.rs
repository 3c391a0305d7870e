use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use common::{ElementId, ReservationId, SpaceId, Version};
use domain::{Element, Reservation, ReservationEvent, Space};
use tokio::sync::RwLock;

use crate::{
    LedgerKey, LedgerStamp, ReservationQuery, Result, ScheduleSnapshot, StoreError,
    query::listing_order,
    store::{
        CatalogStore, ReservationStore, expected_prior, validate_guard, validate_insert,
        validate_write,
    },
};

#[derive(Default)]
struct State {
    spaces: HashMap<SpaceId, Space>,
    elements: HashMap<ElementId, Element>,
    reservations: HashMap<ReservationId, Reservation>,
    events: HashMap<ReservationId, Vec<ReservationEvent>>,
    ledger: HashMap<LedgerKey, Version>,
}

impl State {
    fn ledger_version(&self, key: &LedgerKey) -> Version {
        self.ledger.get(key).copied().unwrap_or(Version::initial())
    }

    /// Verifies every stamped key, then bumps them all.
    fn advance_ledger(&mut self, stamp: &LedgerStamp) -> Result<()> {
        for (key, expected) in stamp.iter() {
            let actual = self.ledger_version(key);
            if actual != *expected {
                metrics::counter!("reservation_ledger_conflicts_total").increment(1);
                return Err(StoreError::ConcurrencyConflict {
                    key: *key,
                    expected: *expected,
                    actual,
                });
            }
        }
        for (key, expected) in stamp.iter() {
            self.ledger.insert(*key, expected.next());
        }
        Ok(())
    }
}

/// In-memory store for tests and database-less deployments.
///
/// All state sits behind one lock, so every snapshot is trivially
/// consistent and every write is atomic. It provides the same interface
/// and conflict semantics as the PostgreSQL implementation.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of reservations stored.
    pub async fn reservation_count(&self) -> usize {
        self.state.read().await.reservations.len()
    }

    /// Current version of a ledger key.
    pub async fn ledger_version(&self, key: &LedgerKey) -> Version {
        self.state.read().await.ledger_version(key)
    }

    /// Clears reservations, history and the ledger, keeping the catalog.
    pub async fn clear_reservations(&self) {
        let mut state = self.state.write().await;
        state.reservations.clear();
        state.events.clear();
        state.ledger.clear();
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn put_space(&self, space: Space) -> Result<()> {
        space.validate()?;
        self.state.write().await.spaces.insert(space.id, space);
        Ok(())
    }

    async fn get_space(&self, space_id: SpaceId) -> Result<Option<Space>> {
        Ok(self.state.read().await.spaces.get(&space_id).cloned())
    }

    async fn list_spaces(&self) -> Result<Vec<Space>> {
        let state = self.state.read().await;
        let mut spaces: Vec<_> = state.spaces.values().cloned().collect();
        spaces.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(spaces)
    }

    async fn delete_space(&self, space_id: SpaceId) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.spaces.contains_key(&space_id) {
            return Err(StoreError::SpaceNotFound(space_id));
        }
        if state.reservations.values().any(|r| r.space_id() == space_id) {
            return Err(StoreError::SpaceInUse(space_id));
        }
        state.spaces.remove(&space_id);
        Ok(())
    }

    async fn put_element(&self, element: Element) -> Result<()> {
        element.validate()?;
        self.state.write().await.elements.insert(element.id, element);
        Ok(())
    }

    async fn get_element(&self, element_id: ElementId) -> Result<Option<Element>> {
        Ok(self.state.read().await.elements.get(&element_id).cloned())
    }

    async fn list_elements(&self) -> Result<Vec<Element>> {
        let state = self.state.read().await;
        let mut elements: Vec<_> = state.elements.values().cloned().collect();
        elements.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(elements)
    }

    async fn delete_element(&self, element_id: ElementId) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.elements.contains_key(&element_id) {
            return Err(StoreError::ElementNotFound(element_id));
        }
        if state
            .reservations
            .values()
            .any(|r| r.uses_element(element_id))
        {
            return Err(StoreError::ElementInUse(element_id));
        }
        state.elements.remove(&element_id);
        Ok(())
    }
}

#[async_trait]
impl ReservationStore for InMemoryStore {
    async fn load_snapshot(
        &self,
        space_id: SpaceId,
        date: NaiveDate,
        element_ids: &[ElementId],
    ) -> Result<ScheduleSnapshot> {
        let state = self.state.read().await;

        let space = state
            .spaces
            .get(&space_id)
            .cloned()
            .ok_or(StoreError::SpaceNotFound(space_id))?;
        let elements = element_ids
            .iter()
            .map(|id| {
                state
                    .elements
                    .get(id)
                    .cloned()
                    .ok_or(StoreError::ElementNotFound(*id))
            })
            .collect::<Result<Vec<_>>>()?;

        let reservations = state
            .reservations
            .values()
            .filter(|r| r.date() == date && r.status().holds_resources())
            .filter(|r| r.space_id() == space_id || element_ids.iter().any(|e| r.uses_element(*e)))
            .cloned()
            .collect();

        let stamp = LedgerKey::for_schedule(space_id, date, element_ids.iter().copied())
            .into_iter()
            .map(|key| {
                let version = state.ledger_version(&key);
                (key, version)
            })
            .collect();

        Ok(ScheduleSnapshot {
            space,
            elements,
            reservations,
            stamp,
        })
    }

    async fn insert(
        &self,
        reservation: &Reservation,
        event: &ReservationEvent,
        stamp: &LedgerStamp,
    ) -> Result<()> {
        validate_insert(reservation, event)?;
        validate_guard(reservation, event, stamp)?;

        let mut state = self.state.write().await;
        if state.reservations.contains_key(&reservation.id()) {
            return Err(StoreError::DuplicateReservation(reservation.id()));
        }
        if !state.spaces.contains_key(&reservation.space_id()) {
            return Err(StoreError::SpaceNotFound(reservation.space_id()));
        }
        if let Some(missing) = reservation
            .element_ids()
            .find(|id| !state.elements.contains_key(id))
        {
            return Err(StoreError::ElementNotFound(missing));
        }

        state.advance_ledger(stamp)?;
        state.reservations.insert(reservation.id(), reservation.clone());
        state.events.insert(reservation.id(), vec![event.clone()]);
        Ok(())
    }

    async fn update(
        &self,
        reservation: &Reservation,
        event: &ReservationEvent,
        stamp: &LedgerStamp,
    ) -> Result<()> {
        validate_write(reservation, event)?;
        validate_guard(reservation, event, stamp)?;

        let mut state = self.state.write().await;
        let current = state
            .reservations
            .get(&reservation.id())
            .ok_or(StoreError::ReservationNotFound(reservation.id()))?;

        let expected = expected_prior(event);
        if current.version() != expected {
            return Err(StoreError::VersionConflict {
                reservation_id: reservation.id(),
                expected,
                actual: current.version(),
            });
        }
        if let Some(missing) = reservation
            .element_ids()
            .find(|id| !state.elements.contains_key(id))
        {
            return Err(StoreError::ElementNotFound(missing));
        }

        state.advance_ledger(stamp)?;
        state.reservations.insert(reservation.id(), reservation.clone());
        state
            .events
            .entry(reservation.id())
            .or_default()
            .push(event.clone());
        Ok(())
    }

    async fn get(&self, reservation_id: ReservationId) -> Result<Option<Reservation>> {
        Ok(self
            .state
            .read()
            .await
            .reservations
            .get(&reservation_id)
            .cloned())
    }

    async fn list(&self, query: ReservationQuery) -> Result<Vec<Reservation>> {
        let state = self.state.read().await;
        let mut reservations: Vec<_> = state
            .reservations
            .values()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        reservations.sort_by(listing_order);

        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(reservations.into_iter().skip(offset).take(limit).collect())
    }

    async fn history(&self, reservation_id: ReservationId) -> Result<Vec<ReservationEvent>> {
        let state = self.state.read().await;
        Ok(state
            .events
            .get(&reservation_id)
            .cloned()
            .unwrap_or_default())
    }
}
