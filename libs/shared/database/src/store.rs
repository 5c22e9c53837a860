use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tokio::time::timeout;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_models::{Appointment, Doctor, Patient, QueueEntry};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("queue for doctor {0} is held by a concurrent operation")]
    QueueBusy(Uuid),

    #[error("doctor {0} not found")]
    DoctorNotFound(Uuid),

    #[error("patient {0} not found")]
    PatientNotFound(Uuid),

    #[error("appointment {0} not found")]
    AppointmentNotFound(Uuid),
}

/// One doctor's waiting line. Only ever mutated while holding the
/// doctor-scoped lock handed out by [`HospitalStore::lock_queue`].
#[derive(Debug, Default)]
pub struct DoctorQueue {
    pub entries: Vec<QueueEntry>,
}

impl DoctorQueue {
    /// Active entries (holding a numbered slot), ordered by position.
    pub fn active_sorted(&self) -> Vec<&QueueEntry> {
        let mut active: Vec<&QueueEntry> =
            self.entries.iter().filter(|e| e.status.is_active()).collect();
        active.sort_by_key(|e| e.position);
        active
    }

    pub fn active_len(&self) -> usize {
        self.entries.iter().filter(|e| e.status.is_active()).count()
    }

    /// The entry that blocks a second booking for this patient, if any.
    pub fn blocking_entry(&self, patient_id: Uuid) -> Option<&QueueEntry> {
        self.entries
            .iter()
            .find(|e| e.patient_id == patient_id && e.status.blocks_rebooking())
    }

    pub fn entry_mut(&mut self, entry_id: Uuid) -> Option<&mut QueueEntry> {
        self.entries.iter_mut().find(|e| e.id == entry_id)
    }
}

/// In-process durable store. Tables sit behind read/write locks; each
/// doctor's queue additionally has its own mutex so that the duplicate
/// check, insertion and re-numbering of one booking commit as a unit
/// while other doctors' queues stay concurrent.
pub struct HospitalStore {
    patients: RwLock<HashMap<Uuid, Patient>>,
    // Directory order is meaningful for matching, so doctors keep a Vec.
    doctors: RwLock<Vec<Doctor>>,
    appointments: RwLock<HashMap<Uuid, Appointment>>,
    queues: RwLock<HashMap<Uuid, Arc<Mutex<DoctorQueue>>>>,
    lock_timeout: Duration,
}

impl HospitalStore {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            patients: RwLock::new(HashMap::new()),
            doctors: RwLock::new(Vec::new()),
            appointments: RwLock::new(HashMap::new()),
            queues: RwLock::new(HashMap::new()),
            lock_timeout,
        }
    }

    // ------------------------------------------------------------------
    // Patients
    // ------------------------------------------------------------------

    pub async fn insert_patient(&self, patient: Patient) {
        debug!("Storing patient {}", patient.id);
        self.patients.write().await.insert(patient.id, patient);
    }

    pub async fn get_patient(&self, patient_id: Uuid) -> Result<Patient, StoreError> {
        self.patients
            .read()
            .await
            .get(&patient_id)
            .cloned()
            .ok_or(StoreError::PatientNotFound(patient_id))
    }

    // ------------------------------------------------------------------
    // Doctors
    // ------------------------------------------------------------------

    pub async fn insert_doctor(&self, doctor: Doctor) {
        debug!("Storing doctor {} ({})", doctor.full_name, doctor.id);
        self.doctors.write().await.push(doctor);
    }

    pub async fn get_doctor(&self, doctor_id: Uuid) -> Result<Doctor, StoreError> {
        self.doctors
            .read()
            .await
            .iter()
            .find(|d| d.id == doctor_id)
            .cloned()
            .ok_or(StoreError::DoctorNotFound(doctor_id))
    }

    /// All doctors in directory order.
    pub async fn list_doctors(&self) -> Vec<Doctor> {
        self.doctors.read().await.clone()
    }

    pub async fn update_doctor<F>(&self, doctor_id: Uuid, f: F) -> Result<Doctor, StoreError>
    where
        F: FnOnce(&mut Doctor),
    {
        let mut doctors = self.doctors.write().await;
        let doctor = doctors
            .iter_mut()
            .find(|d| d.id == doctor_id)
            .ok_or(StoreError::DoctorNotFound(doctor_id))?;
        f(doctor);
        doctor.updated_at = chrono::Utc::now();
        Ok(doctor.clone())
    }

    // ------------------------------------------------------------------
    // Appointments
    // ------------------------------------------------------------------

    pub async fn insert_appointment(&self, appointment: Appointment) {
        debug!("Storing appointment {}", appointment.id);
        self.appointments
            .write()
            .await
            .insert(appointment.id, appointment);
    }

    pub async fn get_appointment(&self, appointment_id: Uuid) -> Result<Appointment, StoreError> {
        self.appointments
            .read()
            .await
            .get(&appointment_id)
            .cloned()
            .ok_or(StoreError::AppointmentNotFound(appointment_id))
    }

    pub async fn update_appointment<F>(
        &self,
        appointment_id: Uuid,
        f: F,
    ) -> Result<Appointment, StoreError>
    where
        F: FnOnce(&mut Appointment),
    {
        let mut appointments = self.appointments.write().await;
        let appointment = appointments
            .get_mut(&appointment_id)
            .ok_or(StoreError::AppointmentNotFound(appointment_id))?;
        f(appointment);
        Ok(appointment.clone())
    }

    // ------------------------------------------------------------------
    // Queues
    // ------------------------------------------------------------------

    /// Acquire the doctor-scoped queue lock. Bounded by the configured
    /// timeout; a timeout maps to `QueueBusy`, which callers treat as a
    /// transaction conflict and retry.
    pub async fn lock_queue(
        &self,
        doctor_id: Uuid,
    ) -> Result<OwnedMutexGuard<DoctorQueue>, StoreError> {
        let handle = self.queue_handle(doctor_id).await;

        match timeout(self.lock_timeout, handle.lock_owned()).await {
            Ok(guard) => Ok(guard),
            Err(_) => {
                warn!(
                    "Timed out after {:?} waiting for queue lock of doctor {}",
                    self.lock_timeout, doctor_id
                );
                Err(StoreError::QueueBusy(doctor_id))
            }
        }
    }

    /// Live queue depth without holding the lock for long.
    pub async fn active_queue_count(&self, doctor_id: Uuid) -> Result<usize, StoreError> {
        let guard = self.lock_queue(doctor_id).await?;
        Ok(guard.active_len())
    }

    async fn queue_handle(&self, doctor_id: Uuid) -> Arc<Mutex<DoctorQueue>> {
        {
            let queues = self.queues.read().await;
            if let Some(handle) = queues.get(&doctor_id) {
                return Arc::clone(handle);
            }
        }

        let mut queues = self.queues.write().await;
        Arc::clone(
            queues
                .entry(doctor_id)
                .or_insert_with(|| Arc::new(Mutex::new(DoctorQueue::default()))),
        )
    }
}
