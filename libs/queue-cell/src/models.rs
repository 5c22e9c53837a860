use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use shared_models::{AppError, PriorityClass, QueueEntry, QueueStatus};

/// Queue entry joined with the patient display name for the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntryView {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub patient_name: String,
    pub appointment_id: Option<Uuid>,
    pub position: i32,
    pub status: QueueStatus,
    pub priority: PriorityClass,
    pub arrival_time: DateTime<Utc>,
    pub estimated_wait_minutes: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub doctor_id: Uuid,
    pub queue: Vec<QueueEntryView>,
    pub total_waiting: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuePositionResponse {
    pub position: i32,
    pub status: QueueStatus,
    pub estimated_wait_minutes: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStatsResponse {
    pub doctor_id: Uuid,
    pub total_waiting: usize,
    pub average_wait_minutes: i32,
    pub completed_today: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateEntryStatusRequest {
    pub status: QueueStatus,
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("patient already has an active booking with this doctor")]
    DuplicateBooking { existing: QueueEntry },

    #[error("patient has no active entry in this doctor's queue")]
    NotInQueue,

    #[error("queue entry {0} not found")]
    EntryNotFound(Uuid),

    #[error("doctor {0} not found")]
    DoctorNotFound(Uuid),

    #[error("invalid queue status transition: {from} -> {to}")]
    InvalidTransition { from: QueueStatus, to: QueueStatus },

    #[error("doctor queue is at capacity ({capacity})")]
    CapacityReached { capacity: i32 },

    #[error("concurrent queue mutation for doctor {0}, retries exhausted")]
    TransactionConflict(Uuid),
}

impl From<QueueError> for AppError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::DuplicateBooking { ref existing } => AppError::DuplicateBooking {
                message: err.to_string(),
                existing_entry: json!(existing),
            },
            QueueError::NotInQueue => AppError::NotFound(err.to_string()),
            QueueError::EntryNotFound(_) | QueueError::DoctorNotFound(_) => {
                AppError::NotFound(err.to_string())
            }
            QueueError::InvalidTransition { .. } => AppError::BadRequest(err.to_string()),
            QueueError::CapacityReached { .. } => AppError::Conflict(err.to_string()),
            QueueError::TransactionConflict(_) => AppError::ServiceUnavailable(err.to_string()),
        }
    }
}
