use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::AppState;
use shared_models::Doctor;

use crate::models::{CreateDoctorRequest, DoctorError, DoctorWithQueueCount};

pub struct DoctorDirectoryService {
    state: Arc<AppState>,
}

impl DoctorDirectoryService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Register a doctor in the directory. Doctors are seeded at setup
    /// time and never deleted during normal operation.
    pub async fn create_doctor(&self, request: CreateDoctorRequest) -> Result<Doctor, DoctorError> {
        if request.full_name.trim().is_empty() {
            return Err(DoctorError::Validation("doctor name is required".into()));
        }
        if request.specialty.trim().is_empty() {
            return Err(DoctorError::Validation("specialty is required".into()));
        }

        let capacity = request.capacity.unwrap_or(20);
        let duration = request
            .consultation_duration_minutes
            .unwrap_or(self.state.config.default_consultation_minutes);
        if capacity <= 0 || duration <= 0 {
            return Err(DoctorError::Validation(
                "capacity and consultation duration must be positive".into(),
            ));
        }

        let now = Utc::now();
        let doctor = Doctor {
            id: Uuid::new_v4(),
            full_name: request.full_name.trim().to_string(),
            specialty: request.specialty.trim().to_string(),
            room: request.room.trim().to_string(),
            capacity,
            consultation_duration_minutes: duration,
            is_available: true,
            created_at: now,
            updated_at: now,
        };

        self.state.store.insert_doctor(doctor.clone()).await;
        info!("Registered doctor {} ({})", doctor.full_name, doctor.id);
        Ok(doctor)
    }

    pub async fn get_doctor(&self, doctor_id: Uuid) -> Result<Doctor, DoctorError> {
        self.state
            .store
            .get_doctor(doctor_id)
            .await
            .map_err(|_| DoctorError::NotFound(doctor_id))
    }

    /// Available doctors in directory order, each annotated with their
    /// live queue depth.
    pub async fn list_available_doctors(&self) -> Result<Vec<DoctorWithQueueCount>, DoctorError> {
        let doctors = self.state.store.list_doctors().await;
        let mut listed = Vec::new();

        for doctor in doctors.into_iter().filter(|d| d.is_available) {
            let queue_count = self
                .state
                .store
                .active_queue_count(doctor.id)
                .await
                .unwrap_or(0);
            listed.push(DoctorWithQueueCount { doctor, queue_count });
        }

        debug!("Listing {} available doctors", listed.len());
        Ok(listed)
    }

    pub async fn set_availability(
        &self,
        doctor_id: Uuid,
        is_available: bool,
    ) -> Result<Doctor, DoctorError> {
        let doctor = self
            .state
            .store
            .update_doctor(doctor_id, |d| d.is_available = is_available)
            .await
            .map_err(|_| DoctorError::NotFound(doctor_id))?;

        info!(
            "Doctor {} availability set to {}",
            doctor_id, is_available
        );
        Ok(doctor)
    }
}
