//! Resource routes: one path per kind, HTTP method picks the engine operation.
//! `/blogs` and `/pastes` get the full CRUD set; `/static` only serves point lookups.

use crate::handlers::resource::{create, get, get_one, remove, update};
use crate::resource::{Page, Paste, Resource, StaticPage};
use crate::state::AppState;
use axum::{routing, routing::MethodRouter, Router};
use tower_http::limit::RequestBodyLimitLayer;

/// Largest accepted request body.
pub const BODY_LIMIT: usize = 1024 * 1024;

fn path<T: Resource>() -> String {
    format!("/{}", T::KIND)
}

/// GET (one or list), POST, PUT and DELETE for a writable kind.
pub fn crud<T: Resource>() -> MethodRouter<AppState> {
    routing::get(get::<T>)
        .post(create::<T>)
        .put(update::<T>)
        .delete(remove::<T>)
}

/// GET by id only.
pub fn read_only<T: Resource>() -> MethodRouter<AppState> {
    routing::get(get_one::<T>)
}

pub fn resource_routes(state: AppState) -> Router {
    Router::new()
        .route(&path::<Page>(), crud::<Page>())
        .route(&path::<Paste>(), crud::<Paste>())
        .route(&path::<StaticPage>(), read_only::<StaticPage>())
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .with_state(state)
}
