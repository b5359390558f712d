//! Table bootstrap: record and content tables for every registered kind.

use crate::error::AppError;
use crate::sql::{add_column, create_content_table, create_record_table};
use crate::table::TableRegistry;
use sqlx::PgPool;
use std::collections::HashSet;

/// DDL statements creating every registered kind's tables, record table before content table.
/// Content tables shared between kinds are created once; each kind adds its payload columns.
pub fn table_ddl(registry: &TableRegistry) -> Vec<String> {
    let mut out = Vec::new();
    let mut seen_content = HashSet::new();
    for reg in registry.iter() {
        out.push(create_record_table(reg.tables.record_table(), reg.layout));
        let content = reg.tables.content_table();
        if seen_content.insert(content.to_string()) {
            out.push(create_content_table(content));
        }
        for col in reg.layout.content {
            let sql = add_column(content, col);
            if !out.contains(&sql) {
                out.push(sql);
            }
        }
    }
    out
}

/// Create missing tables. Idempotent.
pub async fn ensure_tables(pool: &PgPool, registry: &TableRegistry) -> Result<(), AppError> {
    for sql in table_ddl(registry) {
        tracing::debug!(sql = %sql, "ddl");
        sqlx::query(&sql).execute(pool).await?;
    }
    tracing::info!(kinds = registry.iter().count(), "tables ensured");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_content_table_created_once() {
        let ddl = table_ddl(&TableRegistry::with_defaults());
        let creates = ddl
            .iter()
            .filter(|s| s.starts_with("CREATE TABLE IF NOT EXISTS \"page_content\""))
            .count();
        assert_eq!(creates, 1);
        let body_columns = ddl
            .iter()
            .filter(|s| s.contains("ADD COLUMN IF NOT EXISTS \"body\""))
            .count();
        assert_eq!(body_columns, 1);
        assert_eq!(ddl.len(), 3 + 1 + 1);
    }
}
