//! Domain layer for the reservation engine.
//!
//! This crate provides the pure reservation model:
//! - Catalog records (spaces and borrowable elements)
//! - The reservation aggregate with its approval state machine and history events
//! - Roles and actors as supplied by the identity collaborator
//! - The Availability Validator and Stock Allocator, evaluated over an
//!   already-materialized schedule
//!
//! Nothing here performs I/O; loading and persisting schedules is the job of
//! the store crate.

mod text_enum;

pub mod availability;
pub mod catalog;
pub mod error;
pub mod policy;
pub mod reservation;
pub mod role;
pub mod stock;
pub mod window;

pub use availability::{AvailabilityReport, check_availability};
pub use catalog::{Element, ElementCategory, ElementStatus, Space, SpaceKind, SpaceStatus};
pub use error::{CatalogError, ParseEnumError, UnknownElement, ValidationError};
pub use policy::{HoldPolicy, SubmissionRules};
pub use reservation::{
    Amendment, ElementLine, Reservation, ReservationDraft, ReservationError, ReservationEvent,
    ReservationEventKind, ReservationRef, ReservationStatus,
};
pub use role::{Actor, Role};
pub use stock::{Shortfall, StockReport, check_stock, committed_quantity};
pub use window::TimeWindow;
