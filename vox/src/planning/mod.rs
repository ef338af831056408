//! Turning orchestrator output into persisted work

mod materializer;

pub use materializer::{TaskMaterializer, parse_direct_task};
