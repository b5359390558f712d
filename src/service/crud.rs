//! Generic two-table CRUD over any [`Resource`] kind.
//!
//! Every resource is one record row plus one content row sharing an identifier. Writes go
//! through [`Storage::execute_atomic`] when the handle has transactions; otherwise an insert
//! writes the record row first and removes it again if the content write fails, updates
//! touch content before the record, and deletes remove content before the record. Either
//! way no call leaves a content row without its record, and a failed insert leaves neither.

use crate::criteria::Criteria;
use crate::error::AppError;
use crate::resource::Resource;
use crate::service::validation::validate_identifier;
use crate::storage::{Outcome, Statement, Storage, StorageError};
use crate::table::{Tables, CONTENT_KEY, ID_COLUMN, OWNER_COLUMN, RECORD_KEY};
use chrono::Utc;
use serde_json::Value;

pub struct CrudService;

impl CrudService {
    /// Fetch one resource by the criteria's identifier.
    pub async fn fetch_one<T, S>(
        handle: &S,
        criteria: &T::Criteria,
        tables: &Tables,
    ) -> Result<T, AppError>
    where
        T: Resource,
        S: Storage + ?Sized,
    {
        let id = criteria.identifier().ok_or_else(|| {
            AppError::InvalidArgument(format!("{} lookup requires an id", T::KIND))
        })?;
        Self::fetch_by_id(handle, id, tables).await
    }

    /// All resources of the kind, ordered by the layout's ordering key then id.
    pub async fn fetch_many<T, S>(handle: &S, tables: &Tables) -> Result<Vec<T>, AppError>
    where
        T: Resource,
        S: Storage + ?Sized,
    {
        let statement = Statement::SelectJoined {
            tables: tables.clone(),
            layout: T::layout(),
            id: None,
        };
        let rows = handle.execute(&statement).await?.into_rows();
        rows.iter()
            .map(|row| T::from_row(row).map_err(AppError::from))
            .collect()
    }

    /// Insert record and content rows. A blank id is replaced with a fresh UUID.
    /// Returns the resource as stored.
    pub async fn insert<T, S>(handle: &S, mut value: T, tables: &Tables) -> Result<T, AppError>
    where
        T: Resource,
        S: Storage + ?Sized,
    {
        if value.id().trim().is_empty() {
            value.set_id(new_identifier());
        } else {
            validate_identifier(value.id())?;
        }
        value.on_insert(Utc::now());
        let id = value.id().to_string();
        let record = Statement::Insert {
            table: tables.record_table().to_string(),
            columns: T::layout().record,
            key_columns: RECORD_KEY,
            row: value.record_row(),
        };
        let content = Statement::Insert {
            table: tables.content_table().to_string(),
            columns: T::layout().content,
            key_columns: CONTENT_KEY,
            row: content_row(&value, tables),
        };

        if handle.supports_transactions() {
            handle
                .execute_atomic(&[record, content])
                .await
                .map_err(|e| write_error::<T>(&id, e))?;
        } else {
            handle
                .execute(&record)
                .await
                .map_err(|e| write_error::<T>(&id, e))?;
            if let Err(e) = handle.execute(&content).await {
                return Err(Self::compensate::<T, S>(handle, &id, tables, e).await);
            }
        }
        tracing::debug!(kind = T::KIND, id = %id, "inserted");
        Self::fetch_by_id(handle, &id, tables).await
    }

    /// Replace record and content fields of an existing resource. Returns it as stored.
    ///
    /// The content row is written first: a record left without content by an interrupted
    /// delete is not a resource, so it reads as NotFound and is never touched.
    pub async fn update<T, S>(handle: &S, mut value: T, tables: &Tables) -> Result<T, AppError>
    where
        T: Resource,
        S: Storage + ?Sized,
    {
        let id = value.id().trim().to_string();
        if id.is_empty() {
            return Err(AppError::InvalidArgument(format!(
                "{} update requires an id",
                T::KIND
            )));
        }
        value.set_id(id.clone());
        value.on_update(Utc::now());
        let content = Statement::Update {
            table: tables.content_table().to_string(),
            columns: T::layout().content,
            key: tables.content_key(&id),
            row: value.content_row(),
        };
        let record = Statement::Update {
            table: tables.record_table().to_string(),
            columns: T::layout().record,
            key: tables.record_key(&id),
            row: value.record_row(),
        };

        if handle.supports_transactions() {
            match handle.execute_atomic(&[content, record]).await {
                Ok(_) => {}
                Err(StorageError::NoMatch { table }) if table == tables.content_table() => {
                    return Err(not_found::<T>(&id));
                }
                Err(StorageError::NoMatch { .. }) => return Err(orphaned_content::<T>(&id)),
                Err(e) => return Err(e.into()),
            }
        } else {
            if handle.execute(&content).await?.affected() == 0 {
                return Err(not_found::<T>(&id));
            }
            if handle.execute(&record).await?.affected() == 0 {
                return Err(orphaned_content::<T>(&id));
            }
        }
        tracing::debug!(kind = T::KIND, id = %id, "updated");
        Self::fetch_by_id(handle, &id, tables).await
    }

    /// Delete content row then record row.
    pub async fn delete<T, S>(
        handle: &S,
        criteria: &T::Criteria,
        tables: &Tables,
    ) -> Result<(), AppError>
    where
        T: Resource,
        S: Storage + ?Sized,
    {
        let id = criteria.identifier().ok_or_else(|| {
            AppError::InvalidArgument(format!("{} delete requires an id", T::KIND))
        })?;
        let content = Statement::Delete {
            table: tables.content_table().to_string(),
            key: tables.content_key(id),
        };
        let record = Statement::Delete {
            table: tables.record_table().to_string(),
            key: tables.record_key(id),
        };
        let record_n = if handle.supports_transactions() {
            let out = handle.execute_atomic(&[content, record]).await?;
            affected(&out, 1)
        } else {
            handle.execute(&content).await?;
            handle.execute(&record).await?.affected()
        };
        if record_n == 0 {
            return Err(not_found::<T>(id));
        }
        tracing::debug!(kind = T::KIND, id = %id, "deleted");
        Ok(())
    }

    async fn fetch_by_id<T, S>(handle: &S, id: &str, tables: &Tables) -> Result<T, AppError>
    where
        T: Resource,
        S: Storage + ?Sized,
    {
        let statement = Statement::SelectJoined {
            tables: tables.clone(),
            layout: T::layout(),
            id: Some(id.to_string()),
        };
        let rows = handle.execute(&statement).await?.into_rows();
        let row = rows.first().ok_or_else(|| not_found::<T>(id))?;
        Ok(T::from_row(row)?)
    }

    /// Undo a record-row insert whose content write failed. Always returns the error to report.
    async fn compensate<T, S>(
        handle: &S,
        id: &str,
        tables: &Tables,
        original: StorageError,
    ) -> AppError
    where
        T: Resource,
        S: Storage + ?Sized,
    {
        let undo = Statement::Delete {
            table: tables.record_table().to_string(),
            key: tables.record_key(id),
        };
        match handle.execute(&undo).await {
            Ok(_) => {
                tracing::warn!(
                    kind = T::KIND,
                    id = %id,
                    error = %original,
                    "content write failed, record row removed"
                );
                write_error::<T>(id, original)
            }
            Err(compensation) => {
                tracing::error!(
                    kind = T::KIND,
                    id = %id,
                    error = %original,
                    compensation = %compensation,
                    "content write failed and record row could not be removed"
                );
                AppError::Storage(StorageError::Compensation {
                    original: Box::new(original),
                    compensation: Box::new(compensation),
                })
            }
        }
    }
}

/// Fresh identifier: UUIDv4 in simple (32 hex digit) form.
pub fn new_identifier() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn content_row<T: Resource>(value: &T, tables: &Tables) -> crate::storage::Row {
    let mut row = value.content_row();
    row.insert(
        OWNER_COLUMN.to_string(),
        Value::String(tables.record_table().to_string()),
    );
    row.insert(ID_COLUMN.to_string(), Value::String(value.id().to_string()));
    row
}

fn affected(out: &[Outcome], i: usize) -> u64 {
    out.get(i).map(Outcome::affected).unwrap_or(0)
}

fn orphaned_content<T: Resource>(id: &str) -> AppError {
    StorageError::Integrity(format!(
        "{} '{}' has a content row but no record row",
        T::KIND,
        id
    ))
    .into()
}

fn not_found<T: Resource>(id: &str) -> AppError {
    AppError::NotFound(format!("{} '{}'", T::KIND, id))
}

fn write_error<T: Resource>(id: &str, e: StorageError) -> AppError {
    match e {
        StorageError::UniqueViolation { .. } => {
            AppError::Conflict(format!("{} '{}' already exists", T::KIND, id))
        }
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_simple_uuids() {
        let a = new_identifier();
        let b = new_identifier();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
