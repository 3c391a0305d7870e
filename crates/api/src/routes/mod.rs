//! HTTP route handlers.

pub mod availability;
pub mod catalog;
pub mod health;
pub mod metrics;
pub mod reservations;
