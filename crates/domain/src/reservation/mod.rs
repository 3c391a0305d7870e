//! Reservation aggregate and related types.

mod aggregate;
mod events;
mod status;
mod value_objects;

pub use aggregate::Reservation;
pub use events::{
    AmendedData, CancelledData, RejectedData, ReservationEvent, ReservationEventKind,
    SubmittedData,
};
pub use status::ReservationStatus;
pub use value_objects::{
    Amendment, ElementLine, ReservationDraft, ReservationRef, validate_lines,
};

use thiserror::Error;

use crate::error::ValidationError;
use crate::role::Role;

/// Errors that can occur during reservation commands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReservationError {
    /// The input itself is malformed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The reservation is not in a status that allows the action.
    #[error("Illegal transition: cannot {action} a {current} reservation")]
    IllegalTransition {
        current: ReservationStatus,
        action: &'static str,
    },

    /// The actor's role does not permit the action on this reservation.
    #[error("Forbidden: {role} may not {action}")]
    Forbidden { role: Role, action: &'static str },
}
