use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_database::AppState;
use shared_models::error::AppError;

use crate::models::UpdateEntryStatusRequest;
use crate::services::QueueService;

#[axum::debug_handler]
pub async fn get_queue(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = QueueService::new(state);
    let snapshot = service.get_queue(doctor_id).await?;

    Ok(Json(json!(snapshot)))
}

#[axum::debug_handler]
pub async fn get_position(
    State(state): State<Arc<AppState>>,
    Path((patient_id, doctor_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, AppError> {
    let service = QueueService::new(state);
    let position = service.get_position(patient_id, doctor_id).await?;

    Ok(Json(json!(position)))
}

#[axum::debug_handler]
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = QueueService::new(state);
    let stats = service.stats(doctor_id).await?;

    Ok(Json(json!(stats)))
}

#[axum::debug_handler]
pub async fn update_entry_status(
    State(state): State<Arc<AppState>>,
    Path((doctor_id, entry_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateEntryStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let service = QueueService::new(state);
    let entry = service
        .update_entry_status(doctor_id, entry_id, request.status)
        .await?;

    Ok(Json(json!(entry)))
}
