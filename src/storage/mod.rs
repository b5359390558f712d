//! Storage handle contract: structured statements in, rows or affected counts out.
//!
//! The engine never talks to a connection directly. It builds [`Statement`]s and hands
//! them to a [`Storage`] implementation, which is shared across all requests and is
//! responsible for its own pooling.

mod memory;
mod postgres;

pub use memory::{MemoryStorage, WriteKind};
pub use postgres::PgStorage;

use crate::resource::{Column, Layout};
use crate::table::Tables;
use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

/// One row keyed by column name.
pub type Row = Map<String, Value>;

/// Equality conditions identifying rows (column, value), ANDed together.
pub type Key = Vec<(&'static str, Value)>;

#[derive(Clone, Debug)]
pub enum Statement {
    /// Record rows inner-joined with their content rows on (owner, id), ordered by the
    /// layout's ordering key then id. `id` narrows to one record.
    SelectJoined {
        tables: Tables,
        layout: &'static Layout,
        id: Option<String>,
    },
    /// `key_columns` name the table's unique key so in-memory handles can enforce it.
    Insert {
        table: String,
        columns: &'static [Column],
        key_columns: &'static [&'static str],
        row: Row,
    },
    Update {
        table: String,
        columns: &'static [Column],
        key: Key,
        row: Row,
    },
    Delete {
        table: String,
        key: Key,
    },
}

impl Statement {
    /// An update that matched nothing; atomic batches roll back on it.
    pub(crate) fn missed(&self, outcome: &Outcome) -> Option<StorageError> {
        match self {
            Statement::Update { table, .. } if outcome.affected() == 0 => {
                Some(StorageError::NoMatch {
                    table: table.clone(),
                })
            }
            _ => None,
        }
    }

    pub fn table(&self) -> &str {
        match self {
            Statement::SelectJoined { tables, .. } => tables.record_table(),
            Statement::Insert { table, .. }
            | Statement::Update { table, .. }
            | Statement::Delete { table, .. } => table,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Affected(u64),
    Rows(Vec<Row>),
}

impl Outcome {
    /// Rows affected by a write; a result set counts its rows.
    pub fn affected(&self) -> u64 {
        match self {
            Outcome::Affected(n) => *n,
            Outcome::Rows(rows) => rows.len() as u64,
        }
    }

    pub fn into_rows(self) -> Vec<Row> {
        match self {
            Outcome::Rows(rows) => rows,
            Outcome::Affected(_) => Vec::new(),
        }
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),
    #[error("duplicate key in {table}: {detail}")]
    UniqueViolation { table: String, detail: String },
    #[error("{original}; compensating delete failed: {compensation}")]
    Compensation {
        original: Box<StorageError>,
        compensation: Box<StorageError>,
    },
    #[error("injected failure: {0}")]
    Injected(String),
    #[error("storage handle does not support transactions")]
    Unsupported,
    #[error("integrity: {0}")]
    Integrity(String),
    #[error("no row in {table} matched the update")]
    NoMatch { table: String },
}

/// Shared handle over a relational store.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Execute one statement.
    async fn execute(&self, statement: &Statement) -> Result<Outcome, StorageError>;

    /// Whether [`Storage::execute_atomic`] is available.
    fn supports_transactions(&self) -> bool {
        false
    }

    /// Execute statements in order as one unit: all apply or none do. An
    /// [`Statement::Update`] matching no rows aborts the batch with [`StorageError::NoMatch`].
    async fn execute_atomic(&self, statements: &[Statement]) -> Result<Vec<Outcome>, StorageError> {
        let _ = statements;
        Err(StorageError::Unsupported)
    }

    /// Cheap liveness probe used by readiness checks.
    async fn ping(&self) -> Result<(), StorageError>;

    /// Release connections. Statements issued afterwards fail.
    async fn close(&self);
}
