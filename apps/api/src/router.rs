use std::sync::Arc;

use axum::{routing::get, Router};

use appointment_cell::router::appointment_routes;
use doctor_cell::router::doctor_routes;
use patient_cell::router::patient_routes;
use queue_cell::router::queue_routes;
use shared_database::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(|| async { "CareQueue API is running!" }))
        .nest("/api/patients", patient_routes(state.clone()))
        .nest("/api/doctors", doctor_routes(state.clone()))
        .nest("/api/appointments", appointment_routes(state.clone()))
        .nest("/api/queue", queue_routes(state))
}
