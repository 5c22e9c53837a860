use serde::{Deserialize, Serialize};
use shared_models::AppError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePatientRequest {
    pub full_name: String,
    pub phone: Option<String>,
    #[serde(default, alias = "lang")]
    pub preferred_language: Option<String>,
}

#[derive(Debug, Error)]
pub enum PatientError {
    #[error("patient {0} not found")]
    NotFound(Uuid),

    #[error("validation error: {0}")]
    Validation(String),
}

impl From<PatientError> for AppError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::NotFound(_) => AppError::NotFound(err.to_string()),
            PatientError::Validation(msg) => AppError::ValidationError(msg),
        }
    }
}
