use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::Uri,
    Json,
};
use chrono::Utc;
use serde_json::{json, Map, Value};

use super::error::AppError;
use super::state::AppState;
use crate::models::dataset::Dataset;

pub async fn root() -> &'static str {
    concat!(
        "Furfriends API is running. Try /api/health, /api/pets, /api/adopt, ",
        "/api/lost, /api/shelters, /api/shelters/stats"
    )
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let cache = state.open_data.cache();
    let datasets: Map<String, Value> = Dataset::ALL
        .into_iter()
        .map(|dataset| (dataset.key().to_string(), json!(cache.state(dataset.key()))))
        .collect();

    Json(json!({
        "ok": true,
        "service": "backend",
        "time": Utc::now().to_rfc3339(),
        "datasets": datasets,
    }))
}

pub async fn echo(uri: Uri, Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    Json(json!({
        "ok": true,
        "path": uri.path(),
        "query": query,
        "time": Utc::now().to_rfc3339(),
    }))
}

pub async fn db_ping(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    state.pets.ping().await?;
    Ok(Json(json!({ "ok": true })))
}

pub async fn not_found() -> AppError {
    AppError::NotFound
}
