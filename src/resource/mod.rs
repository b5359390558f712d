//! Resource kinds and the contract that lets the generic engine store them in two tables.

mod page;
mod paste;
mod static_page;

pub use page::Page;
pub use paste::Paste;
pub use static_page::StaticPage;

use crate::criteria::Criteria;
use crate::storage::{Row, StorageError};
use crate::table::Tables;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Physical column: name plus PostgreSQL type used for DDL and parameter casts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub pg_type: &'static str,
}

impl Column {
    pub const fn new(name: &'static str, pg_type: &'static str) -> Self {
        Column { name, pg_type }
    }
}

/// Column split of one kind across its two tables.
#[derive(Debug)]
pub struct Layout {
    /// Record-table columns, `id` first.
    pub record: &'static [Column],
    /// Content-table payload columns (the `owner`/`id` key columns are implied).
    pub content: &'static [Column],
    /// Record column listings sort by before falling back to `id`.
    pub order_by: &'static str,
}

/// What a type must provide to be served by [`crate::service::CrudService`].
pub trait Resource: Serialize + DeserializeOwned + Send + Sync + Sized + 'static {
    type Criteria: Criteria + Default + Send + Sync;

    /// Registry key and URL segment (`blogs`, `pastes`, `static`).
    const KIND: &'static str;

    fn layout() -> &'static Layout;

    fn default_tables() -> Tables;

    fn id(&self) -> &str;

    fn set_id(&mut self, id: String);

    /// Record-table values, including `id`. Columns left out are not written on update.
    fn record_row(&self) -> Row;

    /// Content-table payload values (without `owner`/`id`).
    fn content_row(&self) -> Row;

    /// Assemble from one joined record + content row.
    fn from_row(row: &Row) -> Result<Self, StorageError>;

    fn on_insert(&mut self, now: DateTime<Utc>) {
        let _ = now;
    }

    fn on_update(&mut self, now: DateTime<Utc>) {
        let _ = now;
    }
}

/// Text column; SQL NULL reads as empty.
pub(crate) fn text(row: &Row, col: &str) -> Result<String, StorageError> {
    match row.get(col) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Null) => Ok(String::new()),
        Some(other) => Err(StorageError::Integrity(format!(
            "column {} is not text: {}",
            col, other
        ))),
        None => Err(StorageError::Integrity(format!("column {} missing from row", col))),
    }
}

pub(crate) fn timestamp(row: &Row, col: &str) -> Result<Option<DateTime<Utc>>, StorageError> {
    match row.get(col) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(|d| Some(d.with_timezone(&Utc)))
            .map_err(|e| StorageError::Integrity(format!("column {}: {}", col, e))),
        Some(other) => Err(StorageError::Integrity(format!(
            "column {} is not a timestamp: {}",
            col, other
        ))),
    }
}

/// Microsecond precision matches what PostgreSQL keeps for `timestamptz`.
pub(crate) fn timestamp_value(ts: &DateTime<Utc>) -> Value {
    Value::String(ts.to_rfc3339_opts(SecondsFormat::Micros, true))
}

pub(crate) fn truncate_micros(ts: DateTime<Utc>) -> DateTime<Utc> {
    use chrono::{DurationRound, TimeDelta};
    ts.duration_trunc(TimeDelta::microseconds(1)).unwrap_or(ts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_text_reads_empty() {
        let mut row = Row::new();
        row.insert("title".into(), Value::Null);
        assert_eq!(text(&row, "title").unwrap(), "");
        assert!(text(&row, "body").is_err());
    }

    #[test]
    fn timestamp_round_trips_at_micros() {
        let now = truncate_micros(Utc::now());
        let mut row = Row::new();
        row.insert("created_at".into(), timestamp_value(&now));
        assert_eq!(timestamp(&row, "created_at").unwrap(), Some(now));
    }
}
