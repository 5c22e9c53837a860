use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use shared_database::AppState;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", post(handlers::book_appointment))
        .route("/emergency", post(handlers::book_emergency_appointment))
        .route(
            "/{appointment_id}",
            get(handlers::get_appointment).delete(handlers::cancel_appointment),
        )
        .with_state(state)
}
