//! In-memory storage handle for tests, with write-failure injection.

use super::{Key, Outcome, Row, Statement, Storage, StorageError};
use crate::table::{ID_COLUMN, OWNER_COLUMN};
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WriteKind {
    Insert,
    Update,
    Delete,
}

impl WriteKind {
    fn of(statement: &Statement) -> Option<WriteKind> {
        match statement {
            Statement::SelectJoined { .. } => None,
            Statement::Insert { .. } => Some(WriteKind::Insert),
            Statement::Update { .. } => Some(WriteKind::Update),
            Statement::Delete { .. } => Some(WriteKind::Delete),
        }
    }
}

#[derive(Default)]
struct State {
    /// Rows per table in insertion order.
    tables: HashMap<String, Vec<Row>>,
    failures: HashSet<(WriteKind, String)>,
    closed: bool,
}

/// Tables as vectors of rows behind one mutex, held for a single statement or batch.
#[derive(Default)]
pub struct MemoryStorage {
    state: Mutex<State>,
    transactional: bool,
}

impl MemoryStorage {
    /// Handle without transaction support: callers fall back to ordered writes.
    pub fn new() -> Self {
        MemoryStorage::default()
    }

    /// Handle whose [`Storage::execute_atomic`] rolls back on failure.
    pub fn transactional() -> Self {
        MemoryStorage {
            transactional: true,
            ..MemoryStorage::default()
        }
    }

    /// Make every `kind` write against `table` fail until cleared.
    pub fn fail_on(&self, kind: WriteKind, table: &str) {
        self.lock().failures.insert((kind, table.to_string()));
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// Raw rows of one table, for inspecting storage directly.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.lock().tables.get(table).cloned().unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn matches_key(row: &Row, key: &Key) -> bool {
    key.iter().all(|(col, val)| row.get(*col) == Some(val))
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Greater,
        (_, None | Some(Value::Null)) => Ordering::Less,
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

impl State {
    fn apply(&mut self, statement: &Statement) -> Result<Outcome, StorageError> {
        if self.closed {
            return Err(StorageError::Integrity("storage handle is closed".into()));
        }
        if let Some(kind) = WriteKind::of(statement) {
            if self.failures.contains(&(kind, statement.table().to_string())) {
                return Err(StorageError::Injected(format!(
                    "{:?} on {}",
                    kind,
                    statement.table()
                )));
            }
        }
        match statement {
            Statement::SelectJoined { tables, layout, id } => {
                let owner = Value::String(tables.record_table().to_string());
                let empty = Vec::new();
                let records = self.tables.get(tables.record_table()).unwrap_or(&empty);
                let contents = self.tables.get(tables.content_table()).unwrap_or(&empty);
                let mut out = Vec::new();
                for record in records {
                    let record_id = record.get(ID_COLUMN);
                    if let Some(id) = id {
                        if record_id != Some(&Value::String(id.clone())) {
                            continue;
                        }
                    }
                    let content = contents.iter().find(|c| {
                        c.get(OWNER_COLUMN) == Some(&owner) && c.get(ID_COLUMN) == record_id
                    });
                    let Some(content) = content else { continue };
                    let mut joined = Row::new();
                    for col in layout.record {
                        joined.insert(
                            col.name.to_string(),
                            record.get(col.name).cloned().unwrap_or(Value::Null),
                        );
                    }
                    for col in layout.content {
                        joined.insert(
                            col.name.to_string(),
                            content.get(col.name).cloned().unwrap_or(Value::Null),
                        );
                    }
                    out.push(joined);
                }
                out.sort_by(|a, b| {
                    compare_values(a.get(layout.order_by), b.get(layout.order_by))
                        .then_with(|| compare_values(a.get(ID_COLUMN), b.get(ID_COLUMN)))
                });
                Ok(Outcome::Rows(out))
            }
            Statement::Insert {
                table,
                key_columns,
                row,
                ..
            } => {
                let rows = self.tables.entry(table.clone()).or_default();
                let key: Key = key_columns
                    .iter()
                    .map(|c| (*c, row.get(*c).cloned().unwrap_or(Value::Null)))
                    .collect();
                if rows.iter().any(|r| matches_key(r, &key)) {
                    return Err(StorageError::UniqueViolation {
                        table: table.clone(),
                        detail: format!("{:?} already present", key),
                    });
                }
                rows.push(row.clone());
                Ok(Outcome::Affected(1))
            }
            Statement::Update { table, key, row, .. } => {
                let mut n = 0;
                if let Some(rows) = self.tables.get_mut(table) {
                    for r in rows.iter_mut().filter(|r| matches_key(r, key)) {
                        for (col, val) in row {
                            r.insert(col.clone(), val.clone());
                        }
                        n += 1;
                    }
                }
                Ok(Outcome::Affected(n))
            }
            Statement::Delete { table, key } => {
                let mut n = 0;
                if let Some(rows) = self.tables.get_mut(table) {
                    let before = rows.len();
                    rows.retain(|r| !matches_key(r, key));
                    n = (before - rows.len()) as u64;
                }
                Ok(Outcome::Affected(n))
            }
        }
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn execute(&self, statement: &Statement) -> Result<Outcome, StorageError> {
        tracing::debug!(table = statement.table(), "memory statement");
        self.lock().apply(statement)
    }

    fn supports_transactions(&self) -> bool {
        self.transactional
    }

    async fn execute_atomic(&self, statements: &[Statement]) -> Result<Vec<Outcome>, StorageError> {
        if !self.transactional {
            return Err(StorageError::Unsupported);
        }
        let mut state = self.lock();
        let snapshot = state.tables.clone();
        let mut out = Vec::with_capacity(statements.len());
        for statement in statements {
            let result = state
                .apply(statement)
                .and_then(|outcome| match statement.missed(&outcome) {
                    Some(e) => Err(e),
                    None => Ok(outcome),
                });
            match result {
                Ok(outcome) => out.push(outcome),
                Err(e) => {
                    state.tables = snapshot;
                    return Err(e);
                }
            }
        }
        Ok(out)
    }

    async fn ping(&self) -> Result<(), StorageError> {
        if self.lock().closed {
            return Err(StorageError::Integrity("storage handle is closed".into()));
        }
        Ok(())
    }

    async fn close(&self) {
        self.lock().closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Page, Resource};
    use crate::table::{CONTENT_KEY, RECORD_KEY};
    use serde_json::json;

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn insert(table: &str, key_columns: &'static [&'static str], r: Row) -> Statement {
        Statement::Insert {
            table: table.into(),
            columns: &[],
            key_columns,
            row: r,
        }
    }

    fn seed(store: &MemoryStorage, id: &str, created: &str) {
        let t = Page::default_tables();
        let record = row(&[
            ("id", json!(id)),
            ("title", json!(id)),
            ("created_at", json!(created)),
        ]);
        let content = row(&[
            ("owner", json!(t.record_table())),
            ("id", json!(id)),
            ("body", json!("b")),
        ]);
        store
            .lock()
            .apply(&insert(t.record_table(), RECORD_KEY, record))
            .unwrap();
        store
            .lock()
            .apply(&insert(t.content_table(), CONTENT_KEY, content))
            .unwrap();
    }

    fn select(id: Option<&str>) -> Statement {
        Statement::SelectJoined {
            tables: Page::default_tables(),
            layout: Page::layout(),
            id: id.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn join_orders_by_key_then_id() {
        let store = MemoryStorage::new();
        seed(&store, "b", "2024-01-02T00:00:00.000000Z");
        seed(&store, "a", "2024-01-02T00:00:00.000000Z");
        seed(&store, "c", "2024-01-01T00:00:00.000000Z");
        let rows = store.execute(&select(None)).await.unwrap().into_rows();
        let ids: Vec<_> = rows.iter().map(|r| r["id"].as_str().unwrap()).collect();
        assert_eq!(ids, ["c", "a", "b"]);
        assert_eq!(rows[0]["body"], json!("b"));
        assert_eq!(rows[0]["subtitle"], Value::Null);
    }

    #[tokio::test]
    async fn record_without_content_is_invisible() {
        let store = MemoryStorage::new();
        let t = Page::default_tables();
        store
            .execute(&insert(t.record_table(), RECORD_KEY, row(&[("id", json!("x"))])))
            .await
            .unwrap();
        assert!(store.execute(&select(Some("x"))).await.unwrap().into_rows().is_empty());
    }

    #[tokio::test]
    async fn duplicate_key_is_unique_violation() {
        let store = MemoryStorage::new();
        let s = insert("blog_pages", RECORD_KEY, row(&[("id", json!("x"))]));
        store.execute(&s).await.unwrap();
        assert!(matches!(
            store.execute(&s).await,
            Err(StorageError::UniqueViolation { .. })
        ));
    }

    #[tokio::test]
    async fn injected_failure_and_atomic_rollback() {
        let store = MemoryStorage::transactional();
        store.fail_on(WriteKind::Insert, "page_content");
        let batch = [
            insert("blog_pages", RECORD_KEY, row(&[("id", json!("x"))])),
            insert(
                "page_content",
                CONTENT_KEY,
                row(&[("owner", json!("blog_pages")), ("id", json!("x"))]),
            ),
        ];
        assert!(matches!(
            store.execute_atomic(&batch).await,
            Err(StorageError::Injected(_))
        ));
        assert!(store.rows("blog_pages").is_empty());
        store.clear_failures();
        let out = store.execute_atomic(&batch).await.unwrap();
        assert_eq!(out, vec![Outcome::Affected(1), Outcome::Affected(1)]);
    }

    #[tokio::test]
    async fn batch_update_matching_nothing_rolls_back() {
        let store = MemoryStorage::transactional();
        let t = Page::default_tables();
        let bare = row(&[("id", json!("x")), ("title", json!("old"))]);
        store
            .execute(&insert("blog_pages", RECORD_KEY, bare))
            .await
            .unwrap();
        let mut changed = Row::new();
        changed.insert("title".into(), json!("new"));
        let batch = [
            Statement::Update {
                table: "blog_pages".into(),
                columns: &[],
                key: t.record_key("x"),
                row: changed,
            },
            Statement::Update {
                table: "page_content".into(),
                columns: &[],
                key: t.content_key("x"),
                row: Row::new(),
            },
        ];
        match store.execute_atomic(&batch).await {
            Err(StorageError::NoMatch { table }) => assert_eq!(table, "page_content"),
            other => panic!("expected NoMatch, got {:?}", other),
        }
        assert_eq!(store.rows("blog_pages")[0]["title"], json!("old"));
    }

    #[tokio::test]
    async fn non_transactional_rejects_batches() {
        let store = MemoryStorage::new();
        assert!(matches!(
            store.execute_atomic(&[]).await,
            Err(StorageError::Unsupported)
        ));
    }

    #[tokio::test]
    async fn closed_handle_fails() {
        let store = MemoryStorage::new();
        store.close().await;
        assert!(store.ping().await.is_err());
        assert!(store.execute(&select(None)).await.is_err());
    }
}
