use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use doctor_cell::models::MatchType;
use queue_cell::models::QueueError;
use shared_models::{
    AppError, Appointment, BookingSource, Doctor, PriorityClass, QueueEntry,
};

/// Booking request as it arrives from the kiosk. Voice-derived payloads
/// use inconsistent field names (`urgency` vs `priority`, `specialization`
/// vs `specialty_hint`); aliases normalize them here so the ambiguity
/// never reaches the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub patient_id: Uuid,
    /// Explicit target doctor; when absent the matcher resolves one
    /// from the hint and free text.
    pub doctor_id: Option<Uuid>,
    #[serde(default, alias = "specialization", alias = "specialty")]
    pub specialty_hint: Option<String>,
    pub reason: String,
    #[serde(default, alias = "symptom_description")]
    pub symptoms: Option<String>,
    #[serde(default, alias = "urgency")]
    pub priority: PriorityClass,
    #[serde(default)]
    pub source: BookingSource,
    #[serde(default, alias = "lang")]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyBookingRequest {
    pub patient_id: Uuid,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingResponse {
    pub appointment: Appointment,
    pub doctor: Doctor,
    pub queue_entry: QueueEntry,
    pub queue_position: i32,
    pub estimated_wait_minutes: i32,
    /// Present when the doctor was resolved by the matcher instead of
    /// requested explicitly.
    pub match_type: Option<MatchType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancellationResponse {
    pub appointment: Appointment,
    pub already_cancelled: bool,
}

#[derive(Debug, Error)]
pub enum AppointmentError {
    #[error("appointment {0} not found")]
    NotFound(Uuid),

    #[error("patient {0} not found")]
    PatientNotFound(Uuid),

    #[error("doctor {0} not found")]
    DoctorNotFound(Uuid),

    #[error("doctor {0} is not accepting patients")]
    DoctorUnavailable(Uuid),

    #[error("no doctors are available")]
    NoDoctorsAvailable,

    #[error("patient already has an active booking with this doctor")]
    Duplicate { existing: QueueEntry },

    #[error("appointment {0} is already completed and cannot be cancelled")]
    AlreadyCompleted(Uuid),

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound(_)
            | AppointmentError::PatientNotFound(_)
            | AppointmentError::DoctorNotFound(_) => AppError::NotFound(err.to_string()),
            AppointmentError::DoctorUnavailable(_) => AppError::Conflict(err.to_string()),
            AppointmentError::NoDoctorsAvailable => AppError::ServiceUnavailable(err.to_string()),
            AppointmentError::Duplicate { ref existing } => AppError::DuplicateBooking {
                message: err.to_string(),
                existing_entry: json!(existing),
            },
            AppointmentError::AlreadyCompleted(_) => AppError::BadRequest(err.to_string()),
            AppointmentError::Validation(msg) => AppError::ValidationError(msg),
            AppointmentError::Queue(queue_err) => queue_err.into(),
        }
    }
}
