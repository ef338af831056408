//! Persistent state management
//!
//! A single actor owns the store; everything else holds a [`StateManager`]
//! handle. Mutations fan out on a broadcast change feed that panels fold
//! into their local copies.

mod manager;
mod messages;
pub mod sync;

pub use manager::StateManager;
pub use messages::{StateCommand, StateError, StateResponse};
pub use sync::{ChangeEvent, ChangeOp, apply_change};
