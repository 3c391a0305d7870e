//! Reservation Engine.
//!
//! Orchestrates submissions and lifecycle transitions of reservations:
//! - Resolves actors through a [`RoleDirectory`]
//! - Runs the Availability Validator and Stock Allocator against a schedule
//!   snapshot read from the store
//! - Commits only if the snapshot is still current, retrying the whole
//!   cycle when another writer got there first
//!
//! # Example
//!
//! ```ignore
//! use engine::{EngineConfig, InMemoryRoleDirectory, ReservationEngine, SubmitReservation};
//! use reservation_store::InMemoryStore;
//!
//! let engine = ReservationEngine::new(
//!     InMemoryStore::new(),
//!     InMemoryRoleDirectory::new(),
//!     EngineConfig::default(),
//! );
//! let reservation = engine.submit(command).await?;
//! engine.approve(reservation.id(), coordinator_id).await?;
//! ```

pub mod clock;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod identity;

pub use clock::{Clock, FixedClock, SystemClock};
pub use commands::SubmitReservation;
pub use config::EngineConfig;
pub use engine::ReservationEngine;
pub use error::{EngineError, ErrorKind, Result};
pub use identity::{InMemoryRoleDirectory, RoleDirectory};
