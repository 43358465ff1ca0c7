use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::services::open_data::OpenDataError;
use crate::services::pet_store::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("not found")]
    NotFound,

    #[error("upstream unavailable")]
    Upstream(#[from] OpenDataError),

    #[error("{0}")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::BadRequest(e.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(e: QueryRejection) -> Self {
        AppError::BadRequest(e.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                json!({ "ok": false, "message": message }),
            ),
            AppError::NotFound => (
                StatusCode::NOT_FOUND,
                json!({ "ok": false, "message": "not found" }),
            ),
            AppError::Upstream(e) => (
                StatusCode::BAD_GATEWAY,
                json!({ "ok": false, "message": e.to_string(), "detail": e.detail() }),
            ),
            AppError::Internal(message) => {
                error!("Internal error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "ok": false, "message": message }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
