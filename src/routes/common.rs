//! Liveness, readiness and build info.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Serialize)]
struct Readiness {
    status: &'static str,
    storage: &'static str,
    /// Served resource kinds and the record table behind each.
    kinds: Vec<KindTables>,
}

#[derive(Serialize)]
struct KindTables {
    kind: &'static str,
    record: String,
    content: String,
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// 200 while the storage handle answers a ping, 503 otherwise.
async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Readiness>) {
    let kinds = state
        .tables
        .iter()
        .map(|reg| KindTables {
            kind: reg.kind,
            record: reg.tables.record_table().to_string(),
            content: reg.tables.content_table().to_string(),
        })
        .collect();
    match state.storage.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(Readiness {
                status: "ok",
                storage: "ok",
                kinds,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(Readiness {
                    status: "degraded",
                    storage: "unavailable",
                    kinds,
                }),
            )
        }
    }
}

async fn version() -> Json<Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// `/health`, `/ready` and `/version`.
pub fn common_routes_with_ready(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/version", get(version))
        .with_state(state)
}
