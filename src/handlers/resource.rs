//! Resource handlers, generic over the kind: GET (one or list), POST, PUT, DELETE.

use crate::criteria::{decode_body, Criteria, FieldSource};
use crate::error::AppError;
use crate::resource::Resource;
use crate::response::{created, listed, ok};
use crate::service::CrudService;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct IdQuery {
    pub id: Option<String>,
}

fn criteria_from_query<T: Resource>(query: &IdQuery) -> Result<T::Criteria, AppError> {
    let mut criteria = T::Criteria::default();
    criteria.bind_fields(FieldSource::Query(query.id.as_deref()))?;
    Ok(criteria)
}

/// GET with `?id=` fetches one; without it lists every resource of the kind.
pub async fn get<T: Resource>(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> Result<Response, AppError> {
    let tables = state.tables.tables_for::<T>();
    let criteria = criteria_from_query::<T>(&query)?;
    if criteria.identifier().is_some() {
        let item: T = CrudService::fetch_one::<T, _>(&*state.storage, &criteria, &tables).await?;
        Ok(ok(item).into_response())
    } else {
        let items: Vec<T> = CrudService::fetch_many::<T, _>(&*state.storage, &tables).await?;
        tracing::debug!(kind = T::KIND, count = items.len(), "list");
        Ok(listed(items).into_response())
    }
}

/// GET that only serves point lookups; a missing id is a client error.
pub async fn get_one<T: Resource>(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> Result<impl IntoResponse, AppError> {
    let tables = state.tables.tables_for::<T>();
    let criteria = criteria_from_query::<T>(&query)?;
    let item: T = CrudService::fetch_one::<T, _>(&*state.storage, &criteria, &tables).await?;
    Ok(ok(item))
}

pub async fn create<T: Resource>(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let tables = state.tables.tables_for::<T>();
    let value: T = decode_body(&body)?;
    let item = CrudService::insert(&*state.storage, value, &tables).await?;
    tracing::info!(kind = T::KIND, id = item.id(), "created");
    Ok(created(item))
}

pub async fn update<T: Resource>(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let tables = state.tables.tables_for::<T>();
    let mut value: T = decode_body(&body)?;
    // `?id=` wins over a body id so clients can PUT a body without one.
    if let Some(id) = criteria_from_query::<T>(&query)?.identifier() {
        value.set_id(id.to_string());
    }
    let item = CrudService::update(&*state.storage, value, &tables).await?;
    tracing::info!(kind = T::KIND, id = item.id(), "updated");
    Ok(ok(item))
}

/// DELETE by `?id=`, or by `{"id": ...}` in the body.
pub async fn remove<T: Resource>(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let tables = state.tables.tables_for::<T>();
    let mut criteria = criteria_from_query::<T>(&query)?;
    if criteria.identifier().is_none() && !body.is_empty() {
        criteria.bind_fields(FieldSource::Json(&body))?;
    }
    CrudService::delete::<T, _>(&*state.storage, &criteria, &tables).await?;
    tracing::info!(kind = T::KIND, id = criteria.identifier().unwrap_or_default(), "deleted");
    Ok(StatusCode::NO_CONTENT)
}
