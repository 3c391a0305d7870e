//! Engine error types.

use common::{ElementId, ReservationId, SpaceId};
use domain::{
    ReservationError, ReservationRef, ReservationStatus, Shortfall, SpaceStatus, UnknownElement,
    ValidationError,
};
use reservation_store::StoreError;
use serde::Serialize;
use thiserror::Error;

/// Errors returned by reservation engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The request is malformed; nothing was read or written.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The space is in maintenance or blocked.
    #[error("Space {space_id} is unavailable ({status})")]
    SpaceUnavailable {
        space_id: SpaceId,
        status: SpaceStatus,
    },

    /// The window overlaps reservations holding the same space.
    #[error("Time conflict with {} existing reservation(s)", conflicts.len())]
    TimeConflict { conflicts: Vec<ReservationRef> },

    /// One or more element lines exceed the stock left in the window.
    #[error("Insufficient stock for {} element(s)", shortfalls.len())]
    StockShortfall { shortfalls: Vec<Shortfall> },

    /// The reservation's status does not allow the action.
    #[error("Illegal transition: cannot {action} a {current} reservation")]
    IllegalTransition {
        current: ReservationStatus,
        action: &'static str,
    },

    /// The actor is not allowed to perform the action.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Reservation not found: {0}")]
    ReservationNotFound(ReservationId),

    #[error("Space not found: {0}")]
    SpaceNotFound(SpaceId),

    #[error("Element not found: {0}")]
    ElementNotFound(ElementId),

    /// The identity collaborator could not be reached.
    #[error("Identity service error: {0}")]
    Identity(String),

    /// Persistence failed, or commits kept conflicting after every retry.
    #[error("Storage error: {0}")]
    Storage(#[source] StoreError),
}

/// Error classes reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Conflict,
    IllegalTransition,
    Forbidden,
    NotFound,
    Storage,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Conflict => "conflict",
            ErrorKind::IllegalTransition => "illegal_transition",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Storage => "storage",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Validation(_) => ErrorKind::Validation,
            EngineError::SpaceUnavailable { .. }
            | EngineError::TimeConflict { .. }
            | EngineError::StockShortfall { .. } => ErrorKind::Conflict,
            EngineError::IllegalTransition { .. } => ErrorKind::IllegalTransition,
            EngineError::Forbidden(_) => ErrorKind::Forbidden,
            EngineError::ReservationNotFound(_)
            | EngineError::SpaceNotFound(_)
            | EngineError::ElementNotFound(_) => ErrorKind::NotFound,
            EngineError::Identity(_) | EngineError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Storage failures may succeed when retried unchanged; every other
    /// error needs the caller to change something first.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Storage
    }

    pub(crate) fn is_commit_conflict(&self) -> bool {
        matches!(self, EngineError::Storage(e) if e.is_conflict())
    }
}

impl From<ReservationError> for EngineError {
    fn from(err: ReservationError) -> Self {
        match err {
            ReservationError::Validation(e) => EngineError::Validation(e),
            ReservationError::IllegalTransition { current, action } => {
                EngineError::IllegalTransition { current, action }
            }
            forbidden @ ReservationError::Forbidden { .. } => {
                EngineError::Forbidden(forbidden.to_string())
            }
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ReservationNotFound(id) => EngineError::ReservationNotFound(id),
            StoreError::SpaceNotFound(id) => EngineError::SpaceNotFound(id),
            StoreError::ElementNotFound(id) => EngineError::ElementNotFound(id),
            other => EngineError::Storage(other),
        }
    }
}

impl From<UnknownElement> for EngineError {
    fn from(UnknownElement(id): UnknownElement) -> Self {
        EngineError::ElementNotFound(id)
    }
}

/// Convenience type alias for engine results.
pub type Result<T> = std::result::Result<T, EngineError>;
