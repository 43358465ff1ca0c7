//! Open-data proxy endpoints.

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::{
        header::{CACHE_CONTROL, CONTENT_TYPE},
        HeaderName,
    },
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::error::AppError;
use super::state::AppState;
use crate::models::dataset::Dataset;
use crate::utils::normalize::{field_text, normalize_record};

const PROBE_PREVIEW_CHARS: usize = 1000;

#[derive(Debug, Default, Deserialize)]
pub struct ProxyQuery {
    /// Map records through the dataset's field table.
    #[serde(default)]
    pub normalized: bool,
    pub top: Option<usize>,
    pub skip: Option<usize>,
    /// Shelters only: keep records whose city code matches.
    pub city: Option<String>,
}

async fn serve_dataset(
    state: &AppState,
    dataset: Dataset,
    query: Result<Query<ProxyQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(query) = query?;
    let payload = state.open_data.load(dataset).await?;
    let mut records = payload.records;

    if let (Dataset::Shelters, Some(city)) = (dataset, query.city.as_deref()) {
        let city = city.trim();
        records.retain(|record| {
            field_text(dataset.schema(), "cityCode", record).as_deref() == Some(city)
        });
    }

    let skip = query.skip.unwrap_or(0);
    let page = records
        .into_iter()
        .skip(skip)
        .take(query.top.unwrap_or(usize::MAX));
    let records: Vec<Value> = if query.normalized {
        page.enumerate()
            .map(|(i, record)| normalize_record(dataset.schema(), &record, skip + i))
            .collect()
    } else {
        page.collect()
    };

    info!(
        "GET /api/{} -> {} records [{}]",
        dataset,
        records.len(),
        payload.freshness.as_str()
    );

    let headers = [
        (
            CACHE_CONTROL,
            format!("public, max-age={}", state.config.proxy_max_age),
        ),
        (
            HeaderName::from_static("x-cache"),
            payload.freshness.as_str().to_string(),
        ),
    ];
    Ok((headers, Json(records)).into_response())
}

pub async fn adopt(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ProxyQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    serve_dataset(&state, Dataset::Adopt, query).await
}

pub async fn lost(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ProxyQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    serve_dataset(&state, Dataset::Lost, query).await
}

pub async fn shelters(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ProxyQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    serve_dataset(&state, Dataset::Shelters, query).await
}

pub async fn shelter_stats(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ProxyQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    serve_dataset(&state, Dataset::Stats, query).await
}

/// Raw look at what the direct source currently returns.
pub async fn probe(
    State(state): State<Arc<AppState>>,
    Path(dataset): Path<String>,
) -> Result<Response, AppError> {
    let dataset: Dataset = dataset.parse().map_err(|_| AppError::NotFound)?;
    let probe = state.open_data.probe(dataset, PROBE_PREVIEW_CHARS).await;

    let status = probe
        .status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "-".to_string());
    let body = format!(
        "url={}\nok={} status={}\nlen={}\n--- first {} ---\n{}{}",
        probe.url,
        probe.error.is_none(),
        status,
        probe.length,
        PROBE_PREVIEW_CHARS,
        probe.preview,
        probe
            .error
            .map(|e| format!("\n--- error ---\n{e}"))
            .unwrap_or_default(),
    );

    Ok(([(CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response())
}
