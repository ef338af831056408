//! Change feed events and local-copy reconciliation
//!
//! Panels hold transient in-memory copies of store rows and may be ahead
//! of the store during streaming. Every successful mutation broadcasts a
//! [`ChangeEvent`]; panels fold events into their copies with
//! [`apply_change`], which resolves conflicts by `updated_at`
//! (last writer wins).

use serde_json::Value;
use voxstore::Record;

/// What kind of mutation happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

/// A store mutation, keyed by table name
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub table: &'static str,
    pub op: ChangeOp,
    pub id: String,
    /// Full row as JSON; `Null` for deletes
    pub row: Value,
}

impl ChangeEvent {
    pub fn inserted<R: Record>(record: &R) -> Option<Self> {
        Some(Self {
            table: R::table_name(),
            op: ChangeOp::Insert,
            id: record.id().to_string(),
            row: serde_json::to_value(record).ok()?,
        })
    }

    pub fn updated<R: Record>(record: &R) -> Option<Self> {
        Some(Self {
            table: R::table_name(),
            op: ChangeOp::Update,
            id: record.id().to_string(),
            row: serde_json::to_value(record).ok()?,
        })
    }

    pub fn deleted<R: Record>(id: &str) -> Self {
        Self {
            table: R::table_name(),
            op: ChangeOp::Delete,
            id: id.to_string(),
            row: Value::Null,
        }
    }
}

/// Fold one change event into a local collection of records
///
/// Events for other tables are ignored. Inserts and updates upsert by id;
/// an incoming row older than the local copy is dropped.
pub fn apply_change<R: Record + Clone>(local: &mut Vec<R>, event: &ChangeEvent) {
    if event.table != R::table_name() {
        return;
    }
    match event.op {
        ChangeOp::Delete => local.retain(|r| r.id() != event.id),
        ChangeOp::Insert | ChangeOp::Update => {
            let Ok(incoming) = serde_json::from_value::<R>(event.row.clone()) else {
                return;
            };
            match local.iter_mut().find(|r| r.id() == event.id) {
                Some(existing) => {
                    if incoming.updated_at() >= existing.updated_at() {
                        *existing = incoming;
                    }
                }
                None => local.push(incoming),
            }
        }
    }
}
