//! Table descriptors: which record table and content table back a resource kind.

use crate::error::ConfigError;
use crate::resource::{Layout, Page, Paste, Resource, StaticPage};
use crate::storage::Key;
use serde_json::Value;
use std::collections::BTreeMap;

pub const ID_COLUMN: &str = "id";
/// Content-table column holding the owning record table, so kinds can share one content table.
pub const OWNER_COLUMN: &str = "owner";

pub const RECORD_KEY: &[&str] = &[ID_COLUMN];
pub const CONTENT_KEY: &[&str] = &[OWNER_COLUMN, ID_COLUMN];

/// Immutable (record table, content table) pair. Names may be schema-qualified (`schema.table`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tables {
    record: String,
    content: String,
}

impl Tables {
    pub fn new(record: impl Into<String>, content: impl Into<String>) -> Self {
        Tables {
            record: record.into(),
            content: content.into(),
        }
    }

    pub fn record_table(&self) -> &str {
        &self.record
    }

    pub fn content_table(&self) -> &str {
        &self.content
    }

    pub fn record_key(&self, id: &str) -> Key {
        vec![(ID_COLUMN, Value::String(id.to_string()))]
    }

    pub fn content_key(&self, id: &str) -> Key {
        vec![
            (OWNER_COLUMN, Value::String(self.record.clone())),
            (ID_COLUMN, Value::String(id.to_string())),
        ]
    }
}

#[derive(Clone, Debug)]
pub struct Registration {
    pub kind: &'static str,
    pub tables: Tables,
    pub layout: &'static Layout,
}

/// Table pairs per resource kind, keyed by [`Resource::KIND`].
#[derive(Clone, Debug, Default)]
pub struct TableRegistry {
    by_kind: BTreeMap<&'static str, Registration>,
}

impl TableRegistry {
    pub fn new() -> Self {
        TableRegistry::default()
    }

    /// Registry with the built-in kinds on their default tables.
    pub fn with_defaults() -> Self {
        let mut registry = TableRegistry::new();
        registry.register::<Page>().register::<Paste>().register::<StaticPage>();
        registry
    }

    pub fn register<T: Resource>(&mut self) -> &mut Self {
        self.by_kind.insert(
            T::KIND,
            Registration {
                kind: T::KIND,
                tables: T::default_tables(),
                layout: T::layout(),
            },
        );
        self
    }

    /// Point an already registered kind at a different table pair.
    pub fn set_tables(&mut self, kind: &str, tables: Tables) -> Result<(), ConfigError> {
        let reg = self
            .by_kind
            .get_mut(kind)
            .ok_or_else(|| ConfigError::UnknownKind(kind.to_string()))?;
        reg.tables = tables;
        Ok(())
    }

    /// Tables for `T`; falls back to the kind's defaults when it was never registered.
    pub fn tables_for<T: Resource>(&self) -> Tables {
        self.by_kind
            .get(T::KIND)
            .map(|r| r.tables.clone())
            .unwrap_or_else(T::default_tables)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Registration> {
        self.by_kind.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_share_page_content() {
        let registry = TableRegistry::with_defaults();
        let blogs = registry.tables_for::<Page>();
        let pastes = registry.tables_for::<Paste>();
        assert_eq!(blogs.record_table(), "blog_pages");
        assert_eq!(pastes.record_table(), "paste_pages");
        assert_eq!(blogs.content_table(), pastes.content_table());
        assert_eq!(registry.iter().count(), 3);
    }

    #[test]
    fn override_unknown_kind_is_rejected() {
        let mut registry = TableRegistry::with_defaults();
        assert!(registry.set_tables("wiki", Tables::new("a", "b")).is_err());
        registry
            .set_tables("blogs", Tables::new("posts", "post_bodies"))
            .unwrap();
        assert_eq!(registry.tables_for::<Page>(), Tables::new("posts", "post_bodies"));
    }

    #[test]
    fn content_key_carries_owner() {
        let t = Tables::new("blog_pages", "page_content");
        let key = t.content_key("p1");
        assert_eq!(key[0], (OWNER_COLUMN, Value::String("blog_pages".into())));
        assert_eq!(key[1], (ID_COLUMN, Value::String("p1".into())));
    }
}
