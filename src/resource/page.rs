//! Blog page: title and subtitle in `blog_pages`, body in `page_content`.

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
        Column::new("subtitle", "text"),
        Column::new("created_at", "timestamptz"),
        Column::new("updated_at", "timestamptz"),
    ],
    content: &[Column::new("body", "text")],
    order_by: "created_at",
};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    pub body: String,
}

impl Page {
    pub fn new(id: impl Into<String>, title: impl Into<String>, body: impl Into<String>) -> Self {
        Page {
            id: id.into(),
            title: title.into(),
            body: body.into(),
            ..Page::default()
        }
    }
}

impl Resource for Page {
    type Criteria = ById;

    const KIND: &'static str = "blogs";

    fn layout() -> &'static Layout {
        &LAYOUT
    }

    fn default_tables() -> Tables {
        Tables::new("blog_pages", "page_content")
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
        row.insert("subtitle".into(), Value::String(self.subtitle.clone()));
        if let Some(ts) = &self.created_at {
            row.insert("created_at".into(), timestamp_value(ts));
        }
        if let Some(ts) = &self.updated_at {
            row.insert("updated_at".into(), timestamp_value(ts));
        }
        row
    }

    fn content_row(&self) -> Row {
        let mut row = Row::new();
        row.insert("body".into(), Value::String(self.body.clone()));
        row
    }

    fn from_row(row: &Row) -> Result<Self, StorageError> {
        Ok(Page {
            id: text(row, "id")?,
            title: text(row, "title")?,
            subtitle: text(row, "subtitle")?,
            created_at: timestamp(row, "created_at")?,
            updated_at: timestamp(row, "updated_at")?,
            body: text(row, "body")?,
        })
    }

    fn on_insert(&mut self, now: DateTime<Utc>) {
        let now = truncate_micros(now);
        self.created_at.get_or_insert(now);
        self.updated_at = Some(now);
    }

    fn on_update(&mut self, now: DateTime<Utc>) {
        self.updated_at = Some(truncate_micros(now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_row_leaves_created_at_alone() {
        let mut page = Page::new("p1", "Hello", "World");
        page.on_update(Utc::now());
        let row = page.record_row();
        assert!(!row.contains_key("created_at"));
        assert!(row.contains_key("updated_at"));
    }

    #[test]
    fn joined_row_assembles_page() {
        let mut page = Page::new("p1", "Hello", "World");
        page.on_insert(Utc::now());
        let mut row = page.record_row();
        row.extend(page.content_row());
        assert_eq!(Page::from_row(&row).unwrap(), page);
    }

    #[test]
    fn body_is_required() {
        let err = serde_json::from_str::<Page>(r#"{"id":"p1","title":"Hello"}"#);
        assert!(err.is_err());
    }
}
