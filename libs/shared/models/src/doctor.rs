use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub full_name: String,
    pub specialty: String,
    pub room: String,
    /// Maximum concurrent queue depth. Advisory unless capacity
    /// enforcement is enabled in the configuration.
    pub capacity: i32,
    pub consultation_duration_minutes: i32,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Doctor {
    /// Name parts usable for matching a spoken mention against a transcript.
    /// Short parts ("Dr", initials) carry no signal and are skipped.
    pub fn name_parts(&self) -> impl Iterator<Item = &str> {
        self.full_name.split_whitespace().filter(|p| p.len() > 2)
    }

    pub fn is_general_physician(&self) -> bool {
        self.specialty.to_lowercase().contains("general")
    }
}
