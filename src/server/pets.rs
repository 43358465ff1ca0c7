use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::info;

use super::error::AppError;
use super::state::AppState;
use crate::models::pet::{Pet, PetDraft, PetId, PetPatch};

fn parse_id(raw: &str) -> Result<PetId, AppError> {
    raw.parse()
        .map_err(|_| AppError::BadRequest("invalid id format".to_string()))
}

pub async fn list_pets(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Pet>>, AppError> {
    let pets = state.pets.list().await?;
    info!("GET /api/pets -> {} listings", pets.len());
    Ok(Json(pets))
}

pub async fn create_pet(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PetDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<Pet>), AppError> {
    let Json(draft) = payload?;
    let new_pet = draft.validate().ok_or_else(|| {
        AppError::BadRequest("name/image/description are required".to_string())
    })?;

    let pet = state.pets.create(new_pet).await?;
    info!("POST /api/pets -> created id={}", pet.id);
    Ok((StatusCode::CREATED, Json(pet)))
}

pub async fn update_pet(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<PetPatch>, JsonRejection>,
) -> Result<Json<Pet>, AppError> {
    let id = parse_id(&id)?;
    let Json(patch) = payload?;
    if let Some(field) = patch.blank_field() {
        return Err(AppError::BadRequest(format!("{field} must not be empty")));
    }

    let pet = state.pets.update(&id, patch).await?.ok_or(AppError::NotFound)?;
    info!("PUT /api/pets/{} -> updated", id);
    Ok(Json(pet))
}

pub async fn delete_pet(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = parse_id(&id)?;
    state.pets.delete(&id).await?.ok_or(AppError::NotFound)?;
    info!("DELETE /api/pets/{} -> removed", id);
    Ok(Json(json!({ "ok": true })))
}
