use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_database::AppState;
use shared_models::error::AppError;

use crate::models::{CreateDoctorRequest, MatchDoctorRequest, UpdateAvailabilityRequest};
use crate::services::{DoctorDirectoryService, DoctorMatchingService};

#[axum::debug_handler]
pub async fn list_available_doctors(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    let directory = DoctorDirectoryService::new(state);
    let doctors = directory.list_available_doctors().await?;
    let total = doctors.len();

    Ok(Json(json!({
        "doctors": doctors,
        "total": total
    })))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let directory = DoctorDirectoryService::new(state);
    let doctor = directory.get_doctor(doctor_id).await?;

    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn create_doctor(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    let directory = DoctorDirectoryService::new(state);
    let doctor = directory.create_doctor(request).await?;

    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn update_availability(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<UpdateAvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    let directory = DoctorDirectoryService::new(state);
    let doctor = directory
        .set_availability(doctor_id, request.is_available)
        .await?;

    Ok(Json(json!(doctor)))
}

/// Resolve a structured voice intent to a doctor without booking.
/// Used by the kiosk pipeline to confirm the target before check-in.
#[axum::debug_handler]
pub async fn match_doctor(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MatchDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    let doctors: Vec<_> = state
        .store
        .list_doctors()
        .await
        .into_iter()
        .filter(|d| d.is_available)
        .collect();

    let matcher = DoctorMatchingService::new();
    let matched = matcher.resolve(&request.specialty_hint, &request.free_text, &doctors)?;

    Ok(Json(json!(matched)))
}
