use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Insertion precedence for queue entries. `urgent` and `high` are two
/// names for the same tier, absorbed at the serde boundary.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PriorityClass {
    Normal,
    #[serde(alias = "urgent")]
    High,
    Emergency,
}

impl Default for PriorityClass {
    fn default() -> Self {
        PriorityClass::Normal
    }
}

impl fmt::Display for PriorityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriorityClass::Normal => write!(f, "normal"),
            PriorityClass::High => write!(f, "high"),
            PriorityClass::Emergency => write!(f, "emergency"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Waiting,
    Called,
    InSession,
    Completed,
    Cancelled,
}

impl QueueStatus {
    /// Entries holding a slot in the dense 1..n numbering. A called
    /// patient is walking to the room and keeps their position.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            QueueStatus::Waiting | QueueStatus::Called | QueueStatus::InSession
        )
    }

    /// Statuses that block a second booking for the same (patient, doctor) pair.
    pub fn blocks_rebooking(&self) -> bool {
        matches!(self, QueueStatus::Waiting | QueueStatus::Called)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, QueueStatus::Completed | QueueStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: &QueueStatus) -> bool {
        self.valid_transitions().contains(next)
    }

    pub fn valid_transitions(&self) -> Vec<QueueStatus> {
        match self {
            QueueStatus::Waiting => vec![QueueStatus::Called, QueueStatus::Cancelled],
            // Called can fall back to Waiting if the patient missed the call
            QueueStatus::Called => vec![
                QueueStatus::InSession,
                QueueStatus::Waiting,
                QueueStatus::Cancelled,
            ],
            QueueStatus::InSession => vec![QueueStatus::Completed],
            QueueStatus::Completed => vec![],
            QueueStatus::Cancelled => vec![],
        }
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueStatus::Waiting => write!(f, "waiting"),
            QueueStatus::Called => write!(f, "called"),
            QueueStatus::InSession => write!(f, "in_session"),
            QueueStatus::Completed => write!(f, "completed"),
            QueueStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A single patient's live slot in a doctor's waiting line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub appointment_id: Option<Uuid>,
    /// 1-based, dense among active entries for the doctor.
    pub position: i32,
    pub status: QueueStatus,
    pub priority: PriorityClass,
    pub arrival_time: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub estimated_wait_minutes: i32,
}
