//! Folio: generic two-table content backend.
//!
//! Blogs, pastes and static pages are served by one CRUD engine ([`CrudService`]) that is
//! generic over the [`Resource`] kind. Each resource lives in a record table (identity and
//! metadata) and a content table (body), written and read together.

pub mod config;
pub mod criteria;
pub mod error;
pub mod handlers;
pub mod resource;
pub mod response;
pub mod routes;
pub mod schema;
pub mod service;
pub mod sql;
pub mod state;
pub mod storage;
pub mod table;

pub use config::{load, table_registry, DatabaseConfig, ServerConfig};
pub use criteria::{ById, Criteria, FieldSource};
pub use error::{AppError, ConfigError};
pub use resource::{Page, Paste, Resource, StaticPage};
pub use routes::{common_routes_with_ready, resource_routes};
pub use schema::ensure_tables;
pub use service::CrudService;
pub use state::AppState;
pub use storage::{MemoryStorage, PgStorage, Storage, StorageError};
pub use table::{TableRegistry, Tables};
