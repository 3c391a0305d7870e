//! Domain error types.

use chrono::{NaiveDate, NaiveTime};
use common::ElementId;
use thiserror::Error;

/// A request that is malformed regardless of the current schedule.
///
/// Validation errors are raised before any store access and are safe to
/// retry once the caller fixes the input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The end of a time window is not strictly after its start.
    #[error("Invalid time range: end {end} must be after start {start}")]
    InvalidTimeRange { start: NaiveTime, end: NaiveTime },

    /// The motive is shorter than the configured minimum.
    #[error("Motive too short: {actual} characters, at least {min} required")]
    MotiveTooShort { min: usize, actual: usize },

    /// A rejection was attempted without a reason.
    #[error("A rejection reason is required")]
    MissingReason,

    /// An element line requested zero units.
    #[error("Invalid quantity for element {element_id}: must be greater than 0")]
    InvalidQuantity { element_id: ElementId },

    /// The same element appears in more than one line.
    #[error("Element {element_id} is requested more than once")]
    DuplicateElement { element_id: ElementId },

    /// The reservation date lies before today.
    #[error("Reservation date {date} is in the past")]
    DateInPast { date: NaiveDate },

    /// An amendment that does not change anything.
    #[error("Amendment does not change the reservation")]
    EmptyAmendment,
}

/// Errors raised when building catalog records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// Space capacity must be a positive number of people.
    #[error("Invalid capacity: {0} (must be greater than 0)")]
    InvalidCapacity(u32),

    /// Catalog entries must be named.
    #[error("Name must not be empty")]
    EmptyName,
}

/// Error returned when parsing a textual enum value fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown {kind}: {value:?}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// A stock check referenced an element that is not in the catalog snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Unknown element: {0}")]
pub struct UnknownElement(pub ElementId);
