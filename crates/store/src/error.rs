use common::{ElementId, ReservationId, SpaceId, Version};
use domain::{CatalogError, ParseEnumError};
use thiserror::Error;

use crate::LedgerKey;

/// Errors that can occur when interacting with the reservation store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A schedule key moved on since the snapshot was taken.
    /// The caller must re-read and re-validate before writing again.
    #[error("Concurrency conflict on {key}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        key: LedgerKey,
        expected: Version,
        actual: Version,
    },

    /// The reservation record was changed by another writer.
    #[error(
        "Version conflict for reservation {reservation_id}: expected version {expected}, found {actual}"
    )]
    VersionConflict {
        reservation_id: ReservationId,
        expected: Version,
        actual: Version,
    },

    /// The storage-level overlap constraint refused the write.
    #[error("Overlap constraint violated: {0}")]
    OverlapViolation(String),

    #[error("Reservation not found: {0}")]
    ReservationNotFound(ReservationId),

    #[error("Reservation already exists: {0}")]
    DuplicateReservation(ReservationId),

    #[error("Space not found: {0}")]
    SpaceNotFound(SpaceId),

    #[error("Element not found: {0}")]
    ElementNotFound(ElementId),

    /// The space is still referenced by a reservation.
    #[error("Space {0} is referenced by reservations and cannot be deleted")]
    SpaceInUse(SpaceId),

    /// The element is still referenced by a reservation line.
    #[error("Element {0} is referenced by reservations and cannot be deleted")]
    ElementInUse(ElementId),

    /// The record and event passed to a write do not describe the same change.
    #[error("Invalid write: {0}")]
    InvalidWrite(String),

    /// A catalog record failed validation.
    #[error("Invalid catalog record: {0}")]
    Catalog(#[from] CatalogError),

    /// A stored column held a value the domain does not accept.
    #[error("Corrupt record: {0}")]
    Decode(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// True for failures that a fresh read-validate-write cycle may resolve.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            StoreError::ConcurrencyConflict { .. }
                | StoreError::VersionConflict { .. }
                | StoreError::OverlapViolation(_)
        )
    }
}

impl From<ParseEnumError> for StoreError {
    fn from(e: ParseEnumError) -> Self {
        StoreError::Decode(e.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
