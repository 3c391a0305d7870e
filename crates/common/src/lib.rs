//! Identifiers shared by every layer of the reservation engine.

mod types;

pub use types::{ElementId, ReservationId, SpaceId, UserId, Version};
