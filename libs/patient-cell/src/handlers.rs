use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_database::AppState;
use shared_models::error::AppError;

use crate::models::CreatePatientRequest;
use crate::services::PatientService;

#[axum::debug_handler]
pub async fn register_patient(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(state);
    let patient = service.register(request).await?;

    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<Arc<AppState>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(state);
    let patient = service.get_patient(patient_id).await?;

    Ok(Json(json!(patient)))
}
