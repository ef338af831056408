//! voxstore - generic persistent record store for the Vox console
//!
//! Records are serde-serializable structs stored as JSON documents in
//! SQLite, one table per record type. Filtering and ordering go through
//! `json_extract`, so any top-level field can be queried without schema
//! migrations.

mod record;
mod store;

pub use record::{Filter, FilterValue, Order, Record, SortDir};
pub use store::{Store, StoreError};

/// Current time as Unix milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a new time-ordered record identifier
pub fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}
