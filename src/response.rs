//! JSON envelopes for successful responses: `{"data": ...}`, lists add `{"meta": {"count"}}`.

use axum::{http::StatusCode, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct Envelope<T> {
    pub data: T,
}

#[derive(Serialize)]
pub struct ListEnvelope<T> {
    pub data: Vec<T>,
    pub meta: ListMeta,
}

#[derive(Serialize)]
pub struct ListMeta {
    pub count: usize,
}

type Reply<B> = (StatusCode, Json<B>);

/// 201 with the stored resource.
pub fn created<T: Serialize>(data: T) -> Reply<Envelope<T>> {
    (StatusCode::CREATED, Json(Envelope { data }))
}

pub fn ok<T: Serialize>(data: T) -> Reply<Envelope<T>> {
    (StatusCode::OK, Json(Envelope { data }))
}

pub fn listed<T: Serialize>(data: Vec<T>) -> Reply<ListEnvelope<T>> {
    let meta = ListMeta { count: data.len() };
    (StatusCode::OK, Json(ListEnvelope { data, meta }))
}
