use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_database::AppState;
use shared_models::error::AppError;

use crate::models::{BookAppointmentRequest, EmergencyBookingRequest};
use crate::services::AppointmentBookingService;

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(state);
    let response = service.book(request).await?;

    Ok(Json(json!(response)))
}

#[axum::debug_handler]
pub async fn book_emergency_appointment(
    State(state): State<Arc<AppState>>,
    Json(request): Json<EmergencyBookingRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(state);
    let response = service.book_emergency(request).await?;

    Ok(Json(json!(response)))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(state);
    let appointment = service.get(appointment_id).await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(state);
    let response = service.cancel(appointment_id).await?;

    Ok(Json(json!(response)))
}
