//! Engine command inputs.

use chrono::{NaiveDate, NaiveTime};
use common::{ElementId, SpaceId, UserId};
use domain::ElementLine;
use serde::{Deserialize, Serialize};

/// Request for a new reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReservation {
    pub space_id: SpaceId,
    pub requester_id: UserId,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub motive: String,
    #[serde(default)]
    pub lines: Vec<ElementLine>,
}

impl SubmitReservation {
    pub fn new(
        space_id: SpaceId,
        requester_id: UserId,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
        motive: impl Into<String>,
    ) -> Self {
        Self {
            space_id,
            requester_id,
            date,
            start_time,
            end_time,
            motive: motive.into(),
            lines: Vec::new(),
        }
    }

    /// Adds a requested quantity of an element.
    pub fn with_line(mut self, element_id: ElementId, quantity: u32) -> Self {
        self.lines.push(ElementLine::new(element_id, quantity));
        self
    }
}
