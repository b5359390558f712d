//! Paste: a snippet with an optional syntax hint.

use super::{text, timestamp, timestamp_value, truncate_micros, Column, Layout, Resource};
use crate::criteria::ById;
use crate::storage::{Row, StorageError};
use crate::table::Tables;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

static LAYOUT: Layout = Layout {
    record: &[
        Column::new("id", "text"),
        Column::new("title", "text"),
        Column::new("language", "text"),
        Column::new("created_at", "timestamptz"),
    ],
    content: &[Column::new("body", "text")],
    order_by: "created_at",
};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Paste {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Syntax hint for highlighting, e.g. `rust`. Empty means plain text.
    #[serde(default)]
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    pub body: String,
}

impl Resource for Paste {
    type Criteria = ById;

    const KIND: &'static str = "pastes";

    fn layout() -> &'static Layout {
        &LAYOUT
    }

    fn default_tables() -> Tables {
        Tables::new("paste_pages", "page_content")
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn record_row(&self) -> Row {
        let mut row = Row::new();
        row.insert("id".into(), Value::String(self.id.clone()));
        row.insert("title".into(), Value::String(self.title.clone()));
        row.insert("language".into(), Value::String(self.language.clone()));
        if let Some(ts) = &self.created_at {
            row.insert("created_at".into(), timestamp_value(ts));
        }
        row
    }

    fn content_row(&self) -> Row {
        let mut row = Row::new();
        row.insert("body".into(), Value::String(self.body.clone()));
        row
    }

    fn from_row(row: &Row) -> Result<Self, StorageError> {
        Ok(Paste {
            id: text(row, "id")?,
            title: text(row, "title")?,
            language: text(row, "language")?,
            created_at: timestamp(row, "created_at")?,
            body: text(row, "body")?,
        })
    }

    fn on_insert(&mut self, now: DateTime<Utc>) {
        self.created_at.get_or_insert(truncate_micros(now));
    }
}
