//! Value objects for the reservation domain.

use std::collections::HashSet;

use common::{ElementId, ReservationId, SpaceId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::window::TimeWindow;

use super::ReservationStatus;

/// A requested quantity of one element, owned by a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementLine {
    pub element_id: ElementId,
    pub quantity: u32,
}

impl ElementLine {
    pub fn new(element_id: ElementId, quantity: u32) -> Self {
        Self {
            element_id,
            quantity,
        }
    }
}

/// Checks that every line asks for at least one unit and that no element
/// appears twice.
pub fn validate_lines(lines: &[ElementLine]) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(lines.len());
    for line in lines {
        if line.quantity == 0 {
            return Err(ValidationError::InvalidQuantity {
                element_id: line.element_id,
            });
        }
        if !seen.insert(line.element_id) {
            return Err(ValidationError::DuplicateElement {
                element_id: line.element_id,
            });
        }
    }
    Ok(())
}

/// A lightweight reference to an existing reservation, used to report
/// conflicts back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRef {
    pub id: ReservationId,
    pub space_id: SpaceId,
    pub requester_id: UserId,
    pub window: TimeWindow,
    pub status: ReservationStatus,
}

/// The caller-supplied part of a new reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationDraft {
    pub space_id: SpaceId,
    pub requester_id: UserId,
    pub window: TimeWindow,
    pub motive: String,
    #[serde(default)]
    pub lines: Vec<ElementLine>,
}

/// Changes to a pending reservation. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amendment {
    #[serde(default)]
    pub window: Option<TimeWindow>,
    #[serde(default)]
    pub motive: Option<String>,
    #[serde(default)]
    pub lines: Option<Vec<ElementLine>>,
}

impl Amendment {
    pub fn is_empty(&self) -> bool {
        self.window.is_none() && self.motive.is_none() && self.lines.is_none()
    }
}
