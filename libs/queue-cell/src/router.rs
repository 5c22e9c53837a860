use std::sync::Arc;

use axum::{
    routing::{get, patch},
    Router,
};

use shared_database::AppState;

use crate::handlers;

pub fn queue_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/position/{patient_id}/{doctor_id}", get(handlers::get_position))
        .route("/{doctor_id}", get(handlers::get_queue))
        .route("/{doctor_id}/stats", get(handlers::get_stats))
        .route(
            "/{doctor_id}/entries/{entry_id}/status",
            patch(handlers::update_entry_status),
        )
        .with_state(state)
}
