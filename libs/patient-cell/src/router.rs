use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use shared_database::AppState;

use crate::handlers;

pub fn patient_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", post(handlers::register_patient))
        .route("/{patient_id}", get(handlers::get_patient))
        .with_state(state)
}
