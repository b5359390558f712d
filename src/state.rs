//! Shared application state for all routes.

use crate::storage::Storage;
use crate::table::TableRegistry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    /// One handle shared by every request; pooling is the handle's job.
    pub storage: Arc<dyn Storage>,
    pub tables: Arc<TableRegistry>,
}

impl AppState {
    pub fn new(storage: Arc<dyn Storage>, tables: TableRegistry) -> Self {
        AppState {
            storage,
            tables: Arc::new(tables),
        }
    }
}
