//! Record trait and query types

use serde::Serialize;
use serde::de::DeserializeOwned;

/// A persistable record
///
/// Implementors are stored as JSON documents in the table named by
/// [`Record::table_name`]. The id is the primary key; `updated_at` is
/// mirrored into a column so staleness checks don't need to parse JSON.
pub trait Record: Serialize + DeserializeOwned + Send + 'static {
    /// Unique identifier
    fn id(&self) -> &str;

    /// Last update timestamp (Unix milliseconds)
    fn updated_at(&self) -> i64;

    /// Table this record type is stored in
    fn table_name() -> &'static str;
}

/// Value a filter compares against
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Int(i64),
    Bool(bool),
}

/// Equality filter on a top-level JSON field
#[derive(Debug, Clone)]
pub struct Filter {
    pub field: String,
    pub value: FilterValue,
}

impl Filter {
    /// Filter on a text field
    pub fn text(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: FilterValue::Text(value.into()),
        }
    }

    /// Filter on an integer field
    pub fn int(field: impl Into<String>, value: i64) -> Self {
        Self {
            field: field.into(),
            value: FilterValue::Int(value),
        }
    }

    /// Filter on a boolean field
    pub fn boolean(field: impl Into<String>, value: bool) -> Self {
        Self {
            field: field.into(),
            value: FilterValue::Bool(value),
        }
    }
}

/// Sort direction for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

/// Ordering on a top-level JSON field
#[derive(Debug, Clone)]
pub struct Order {
    pub field: String,
    pub dir: SortDir,
}

impl Order {
    /// Ascending order on a field
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            dir: SortDir::Asc,
        }
    }

    /// Descending order on a field
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            dir: SortDir::Desc,
        }
    }
}
