//! Catalog Store and Reservation Repository.
//!
//! Holds the schedule state the engine validates against, and the schedule
//! ledger that makes each validate-then-persist cycle atomic relative to
//! other writers touching the same space or element on the same day.

pub mod error;
pub mod ledger;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod snapshot;
pub mod store;

pub use error::{Result, StoreError};
pub use ledger::{LedgerKey, LedgerStamp};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use query::ReservationQuery;
pub use snapshot::ScheduleSnapshot;
pub use store::{CatalogStore, ReservationStore, validate_insert, validate_write};
