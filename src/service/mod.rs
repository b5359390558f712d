//! CrudService: generic two-table CRUD over resource kinds.

mod crud;
mod validation;
pub use crud::{new_identifier, CrudService};
pub use validation::validate_identifier;
