//! Static page: point lookup only, no listing or writes over HTTP.

use super::{text, Column, Layout, Resource};
use crate::criteria::ById;
use crate::storage::{Row, StorageError};
use crate::table::Tables;
use serde::{Deserialize, Serialize};
use serde_json::Value;

static LAYOUT: Layout = Layout {
    record: &[Column::new("id", "text"), Column::new("title", "text")],
    content: &[Column::new("body", "text")],
    order_by: "id",
};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticPage {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub body: String,
}

impl Resource for StaticPage {
    type Criteria = ById;

    const KIND: &'static str = "static";

    fn layout() -> &'static Layout {
        &LAYOUT
    }

    fn default_tables() -> Tables {
        Tables::new("static_pages", "page_content")
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
        row
    }

    fn content_row(&self) -> Row {
        let mut row = Row::new();
        row.insert("body".into(), Value::String(self.body.clone()));
        row
    }

    fn from_row(row: &Row) -> Result<Self, StorageError> {
        Ok(StaticPage {
            id: text(row, "id")?,
            title: text(row, "title")?,
            body: text(row, "body")?,
        })
    }
}
