//! Renders storage statements as parameterized PostgreSQL.

use crate::resource::{Column, Layout};
use crate::storage::{Key, Row, Statement};
use crate::table::{Tables, ID_COLUMN, OWNER_COLUMN};
use serde_json::Value;

const RECORD_ALIAS: &str = "r";
const CONTENT_ALIAS: &str = "c";

/// Quote identifier for PostgreSQL (safe: only from layouts and config).
pub(crate) fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Table reference; `schema.table` is quoted per part.
pub(crate) fn table_ref(name: &str) -> String {
    name.split('.').map(quoted).collect::<Vec<_>>().join(".")
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> u32 {
        let n = self.params.len() as u32 + 1;
        self.params.push(v);
        n
    }

    /// Push a parameter and return its placeholder, cast when the column type is known.
    fn placeholder(&mut self, v: Value, columns: &[Column], name: &str) -> String {
        let n = self.push_param(v);
        columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| format!("${}::{}", n, c.pg_type))
            .unwrap_or_else(|| format!("${}", n))
    }

    fn where_key(&mut self, key: &Key) -> String {
        key.iter()
            .map(|(col, val)| {
                let n = self.push_param(val.clone());
                format!("{} = ${}", quoted(col), n)
            })
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

pub fn render(statement: &Statement) -> QueryBuf {
    match statement {
        Statement::SelectJoined { tables, layout, id } => {
            select_joined(tables, layout, id.as_deref())
        }
        Statement::Insert { table, columns, row, .. } => insert(table, columns, row),
        Statement::Update {
            table,
            columns,
            key,
            row,
        } => update(table, columns, key, row),
        Statement::Delete { table, key } => delete(table, key),
    }
}

/// SELECT record columns and content payload columns, joined on (owner, id).
/// $1 is the owner (record table name); $2, when present, the id.
pub fn select_joined(tables: &Tables, layout: &Layout, id: Option<&str>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let cols = layout
        .record
        .iter()
        .map(|c| format!("{}.{}", RECORD_ALIAS, quoted(c.name)))
        .chain(
            layout
                .content
                .iter()
                .map(|c| format!("{}.{}", CONTENT_ALIAS, quoted(c.name))),
        )
        .collect::<Vec<_>>()
        .join(", ");
    let owner = q.push_param(Value::String(tables.record_table().to_string()));
    let join = format!(
        "{c}.{owner_col} = ${owner} AND {c}.{id} = {r}.{id}",
        c = CONTENT_ALIAS,
        r = RECORD_ALIAS,
        owner_col = quoted(OWNER_COLUMN),
        owner = owner,
        id = quoted(ID_COLUMN),
    );
    let where_clause = match id {
        Some(id) => {
            let n = q.push_param(Value::String(id.to_string()));
            format!(" WHERE {}.{} = ${}", RECORD_ALIAS, quoted(ID_COLUMN), n)
        }
        None => String::new(),
    };
    let mut order = vec![format!("{}.{}", RECORD_ALIAS, quoted(layout.order_by))];
    if layout.order_by != ID_COLUMN {
        order.push(format!("{}.{}", RECORD_ALIAS, quoted(ID_COLUMN)));
    }
    q.sql = format!(
        "SELECT {} FROM {} {} JOIN {} {} ON {}{} ORDER BY {}",
        cols,
        table_ref(tables.record_table()),
        RECORD_ALIAS,
        table_ref(tables.content_table()),
        CONTENT_ALIAS,
        join,
        where_clause,
        order.join(", ")
    );
    q
}

/// INSERT with one placeholder per row value, cast by column type.
pub fn insert(table: &str, columns: &[Column], row: &Row) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::with_capacity(row.len());
    let mut placeholders = Vec::with_capacity(row.len());
    for (name, val) in row {
        cols.push(quoted(name));
        placeholders.push(q.placeholder(val.clone(), columns, name));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table_ref(table),
        cols.join(", "),
        placeholders.join(", ")
    );
    q
}

/// UPDATE by key: SET every row column that is not part of the key.
pub fn update(table: &str, columns: &[Column], key: &Key, row: &Row) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for (name, val) in row {
        if key.iter().any(|(k, _)| *k == name.as_str()) {
            continue;
        }
        let rhs = q.placeholder(val.clone(), columns, name);
        sets.push(format!("{} = {}", quoted(name), rhs));
    }
    if sets.is_empty() {
        // Nothing to change; still report whether the key matched.
        if let Some((k, _)) = key.first() {
            sets.push(format!("{} = {}", quoted(k), quoted(k)));
        }
    }
    let where_clause = q.where_key(key);
    q.sql = format!(
        "UPDATE {} SET {} WHERE {}",
        table_ref(table),
        sets.join(", "),
        where_clause
    );
    q
}

pub fn delete(table: &str, key: &Key) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_clause = q.where_key(key);
    q.sql = format!("DELETE FROM {} WHERE {}", table_ref(table), where_clause);
    q
}

/// CREATE TABLE for a record table: layout columns, `id` as primary key.
pub fn create_record_table(table: &str, layout: &Layout) -> String {
    let mut defs: Vec<String> = layout
        .record
        .iter()
        .map(|c| {
            if c.name == ID_COLUMN {
                format!("{} {} NOT NULL", quoted(c.name), c.pg_type)
            } else {
                format!("{} {}", quoted(c.name), c.pg_type)
            }
        })
        .collect();
    defs.push(format!("PRIMARY KEY ({})", quoted(ID_COLUMN)));
    format!("CREATE TABLE IF NOT EXISTS {} ({})", table_ref(table), defs.join(", "))
}

/// CREATE TABLE for a content table: (owner, id) key plus the key columns only;
/// payload columns are added separately so kinds sharing the table can each add theirs.
pub fn create_content_table(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({owner} text NOT NULL, {id} text NOT NULL, PRIMARY KEY ({owner}, {id}))",
        table_ref(table),
        owner = quoted(OWNER_COLUMN),
        id = quoted(ID_COLUMN),
    )
}

pub fn add_column(table: &str, column: &Column) -> String {
    format!(
        "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {} {}",
        table_ref(table),
        quoted(column.name),
        column.pg_type
    )
}
