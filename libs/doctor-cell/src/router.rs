use std::sync::Arc;

use axum::{
    routing::{get, patch, post},
    Router,
};

use shared_database::AppState;

use crate::handlers;

pub fn doctor_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/",
            get(handlers::list_available_doctors).post(handlers::create_doctor),
        )
        .route("/match", post(handlers::match_doctor))
        .route("/{doctor_id}", get(handlers::get_doctor))
        .route("/{doctor_id}/availability", patch(handlers::update_availability))
        .with_state(state)
}
