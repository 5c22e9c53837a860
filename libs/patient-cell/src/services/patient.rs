use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use shared_database::AppState;
use shared_models::Patient;

use crate::models::{CreatePatientRequest, PatientError};

pub struct PatientService {
    state: Arc<AppState>,
}

impl PatientService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Register a patient. Identity resolution (face check-in) happens in
    /// the external biometric service; this only records the profile.
    pub async fn register(&self, request: CreatePatientRequest) -> Result<Patient, PatientError> {
        if request.full_name.trim().is_empty() {
            return Err(PatientError::Validation("patient name is required".into()));
        }

        let patient = Patient {
            id: Uuid::new_v4(),
            full_name: request.full_name.trim().to_string(),
            phone: request.phone,
            preferred_language: request.preferred_language.unwrap_or_else(|| "en".to_string()),
            created_at: Utc::now(),
        };

        self.state.store.insert_patient(patient.clone()).await;
        info!("Registered patient {}", patient.id);
        Ok(patient)
    }

    pub async fn get_patient(&self, patient_id: Uuid) -> Result<Patient, PatientError> {
        self.state
            .store
            .get_patient(patient_id)
            .await
            .map_err(|_| PatientError::NotFound(patient_id))
    }
}
