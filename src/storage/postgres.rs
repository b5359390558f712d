//! PostgreSQL storage handle over a sqlx pool.

use super::{Outcome, Row, Statement, Storage, StorageError};
use crate::config::DatabaseConfig;
use crate::sql::{render, PgBindValue, QueryBuf};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres};
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub fn from_pool(pool: PgPool) -> Self {
        PgStorage { pool }
    }

    /// Open a pool from configuration. Returns the handle and a printable connection
    /// descriptor with the password left out.
    pub async fn connect(config: &DatabaseConfig) -> Result<(PgStorage, String), StorageError> {
        let (options, descriptor) = connect_options(config)?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_with(options)
            .await?;
        Ok((PgStorage { pool }, descriptor))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Connection options from either a URL or the individual socket/host/user/database fields.
pub(crate) fn connect_options(
    config: &DatabaseConfig,
) -> Result<(PgConnectOptions, String), StorageError> {
    if let Some(url) = config.url.as_deref().filter(|u| !u.is_empty()) {
        let options = PgConnectOptions::from_str(url)?;
        let descriptor = format!(
            "postgres://{}@{}:{}/{}",
            options.get_username(),
            options.get_host(),
            options.get_port(),
            options.get_database().unwrap_or_default()
        );
        return Ok((options, descriptor));
    }
    let mut options = PgConnectOptions::new()
        .username(&config.username)
        .database(&config.database);
    if !config.password.is_empty() {
        options = options.password(&config.password);
    }
    let location = if !config.unix_socket.is_empty() {
        options = options.socket(&config.unix_socket);
        format!("unix({})", config.unix_socket)
    } else {
        options = options.host(&config.host).port(config.port);
        format!("{}:{}", config.host, config.port)
    };
    let descriptor = format!("postgres://{}@{}/{}", config.username, location, config.database);
    Ok((options, descriptor))
}

fn classify(table: &str, e: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StorageError::UniqueViolation {
                table: table.to_string(),
                detail: db.message().to_string(),
            };
        }
    }
    StorageError::Database(e)
}

async fn run<'e, E>(
    executor: E,
    statement: &Statement,
    q: &QueryBuf,
) -> Result<Outcome, StorageError>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let mut query = sqlx::query(&q.sql);
    for p in &q.params {
        query = query.bind(PgBindValue::from(p));
    }
    match statement {
        Statement::SelectJoined { .. } => {
            let rows = query
                .fetch_all(executor)
                .await
                .map_err(|e| classify(statement.table(), e))?;
            Ok(Outcome::Rows(rows.iter().map(row_to_json).collect()))
        }
        _ => {
            let done = query
                .execute(executor)
                .await
                .map_err(|e| classify(statement.table(), e))?;
            Ok(Outcome::Affected(done.rows_affected()))
        }
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn execute(&self, statement: &Statement) -> Result<Outcome, StorageError> {
        let q = render(statement);
        run(&self.pool, statement, &q).await
    }

    fn supports_transactions(&self) -> bool {
        true
    }

    async fn execute_atomic(&self, statements: &[Statement]) -> Result<Vec<Outcome>, StorageError> {
        let mut tx = self.pool.begin().await?;
        let mut out = Vec::with_capacity(statements.len());
        for statement in statements {
            let q = render(statement);
            // Dropping `tx` on error rolls back.
            let outcome = run(&mut *tx, statement, &q).await?;
            if let Some(e) = statement.missed(&outcome) {
                return Err(e);
            }
            out.push(outcome);
        }
        tx.commit().await?;
        Ok(out)
    }

    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

fn row_to_json(row: &PgRow) -> Row {
    use sqlx::Column;
    use sqlx::Row as _;
    let mut map = Row::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    map
}

fn cell_to_value(row: &PgRow, name: &str) -> Value {
    use sqlx::Row as _;
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return crate::resource::timestamp_value(&d);
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_descriptor_omits_password() {
        let config = DatabaseConfig {
            unix_socket: "/var/run/postgresql".into(),
            username: "folio".into(),
            password: "secret".into(),
            database: "site".into(),
            ..DatabaseConfig::default()
        };
        let (_, descriptor) = connect_options(&config).unwrap();
        assert_eq!(descriptor, "postgres://folio@unix(/var/run/postgresql)/site");
        assert!(!descriptor.contains("secret"));
    }

    #[test]
    fn url_takes_precedence() {
        let config = DatabaseConfig {
            url: Some("postgres://app:pw@db.internal:6543/pages".into()),
            unix_socket: "/tmp".into(),
            ..DatabaseConfig::default()
        };
        let (options, descriptor) = connect_options(&config).unwrap();
        assert_eq!(options.get_port(), 6543);
        assert_eq!(descriptor, "postgres://app@db.internal:6543/pages");
    }
}
