//! Schedule ledger: one version counter per space-day and element-day.
//!
//! Every write that can add a hold bumps the counters of the keys it touches
//! and fails if any of them moved since the writer's snapshot. Two writers
//! that read overlapping parts of the schedule therefore cannot both commit
//! on a stale view, which makes the validate-then-persist sequence
//! serializable per space and per element.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use common::{ElementId, SpaceId, Version};
use serde::{Deserialize, Serialize};

/// A unit of schedule state guarded by one version counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerKey {
    Space { space_id: SpaceId, date: NaiveDate },
    Element { element_id: ElementId, date: NaiveDate },
}

impl LedgerKey {
    pub fn space(space_id: SpaceId, date: NaiveDate) -> Self {
        LedgerKey::Space { space_id, date }
    }

    pub fn element(element_id: ElementId, date: NaiveDate) -> Self {
        LedgerKey::Element { element_id, date }
    }

    /// Keys touched by a reservation of `space_id` on `date` using `element_ids`.
    pub fn for_schedule(
        space_id: SpaceId,
        date: NaiveDate,
        element_ids: impl IntoIterator<Item = ElementId>,
    ) -> Vec<LedgerKey> {
        let mut keys = vec![LedgerKey::space(space_id, date)];
        keys.extend(
            element_ids
                .into_iter()
                .map(|element_id| LedgerKey::element(element_id, date)),
        );
        keys.sort();
        keys.dedup();
        keys
    }
}

impl std::fmt::Display for LedgerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerKey::Space { space_id, date } => write!(f, "space:{space_id}:{date}"),
            LedgerKey::Element { element_id, date } => write!(f, "element:{element_id}:{date}"),
        }
    }
}

/// The ledger versions observed by a snapshot.
///
/// Keys that have never been written are recorded at `Version::initial()`.
/// An empty stamp guards nothing and is used for writes that only release
/// holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerStamp {
    entries: BTreeMap<LedgerKey, Version>,
}

impl LedgerStamp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: LedgerKey, version: Version) {
        self.entries.insert(key, version);
    }

    pub fn get(&self, key: &LedgerKey) -> Option<Version> {
        self.entries.get(key).copied()
    }

    pub fn covers(&self, key: &LedgerKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Entries in key order, which is also the lock order used by writers.
    pub fn iter(&self) -> impl Iterator<Item = (&LedgerKey, &Version)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(LedgerKey, Version)> for LedgerStamp {
    fn from_iter<T: IntoIterator<Item = (LedgerKey, Version)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
