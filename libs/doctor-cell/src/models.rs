use std::fmt;

use serde::{Deserialize, Serialize};
use shared_models::{AppError, Doctor};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDoctorRequest {
    pub full_name: String,
    pub specialty: String,
    pub room: String,
    pub capacity: Option<i32>,
    pub consultation_duration_minutes: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAvailabilityRequest {
    pub is_available: bool,
}

/// Directory listing entry: a doctor annotated with their live queue depth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorWithQueueCount {
    #[serde(flatten)]
    pub doctor: Doctor,
    pub queue_count: usize,
}

/// How a booking request was resolved to a doctor, for observability.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Name,
    Specialty,
    Fallback,
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchType::Name => write!(f, "name"),
            MatchType::Specialty => write!(f, "specialty"),
            MatchType::Fallback => write!(f, "fallback"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorMatch {
    pub doctor: Doctor,
    pub match_type: MatchType,
}

/// Structured intent from the voice pipeline. The upstream AI extraction
/// is loose with field names, absorbed here via aliases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchDoctorRequest {
    #[serde(default, alias = "specialization", alias = "specialty")]
    pub specialty_hint: String,
    #[serde(default, alias = "transcript", alias = "text")]
    pub free_text: String,
}

#[derive(Debug, Error)]
pub enum DoctorError {
    #[error("doctor {0} not found")]
    NotFound(Uuid),

    #[error("no doctors are available")]
    NoDoctorsAvailable,

    #[error("validation error: {0}")]
    Validation(String),
}

impl From<DoctorError> for AppError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::NotFound(_) => AppError::NotFound(err.to_string()),
            DoctorError::NoDoctorsAvailable => AppError::ServiceUnavailable(err.to_string()),
            DoctorError::Validation(msg) => AppError::ValidationError(msg),
        }
    }
}
