use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::queue::PriorityClass;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub reason: String,
    pub symptoms: Option<String>,
    pub priority: PriorityClass,
    pub source: BookingSource,
    pub language: String,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub consultation_started_at: Option<DateTime<Utc>>,
    pub consultation_ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingSource {
    Voice,
    Manual,
    Emergency,
}

impl Default for BookingSource {
    fn default() -> Self {
        BookingSource::Manual
    }
}

impl fmt::Display for BookingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingSource::Voice => write!(f, "voice"),
            BookingSource::Manual => write!(f, "manual"),
            BookingSource::Emergency => write!(f, "emergency"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Requested,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::NoShow
        )
    }

    pub fn can_transition_to(&self, next: &AppointmentStatus) -> bool {
        self.valid_transitions().contains(next)
    }

    pub fn valid_transitions(&self) -> Vec<AppointmentStatus> {
        match self {
            AppointmentStatus::Requested => {
                vec![AppointmentStatus::Confirmed, AppointmentStatus::Cancelled]
            }
            AppointmentStatus::Confirmed => vec![
                AppointmentStatus::InProgress,
                AppointmentStatus::Cancelled,
                AppointmentStatus::NoShow,
            ],
            AppointmentStatus::InProgress => {
                vec![AppointmentStatus::Completed, AppointmentStatus::Cancelled]
            }
            // Terminal states
            AppointmentStatus::Completed => vec![],
            AppointmentStatus::Cancelled => vec![],
            AppointmentStatus::NoShow => vec![],
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Requested => write!(f, "requested"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::InProgress => write!(f, "in_progress"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::NoShow => write!(f, "no_show"),
        }
    }
}
