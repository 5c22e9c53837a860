use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use doctor_cell::models::MatchType;
use doctor_cell::services::{DoctorDirectoryService, DoctorMatchingService};
use queue_cell::models::QueueError;
use queue_cell::services::QueueService;
use shared_database::AppState;
use shared_models::{
    Appointment, AppointmentStatus, BookingSource, Doctor, Patient, PriorityClass, QueueEntry,
};

use crate::models::{
    AppointmentError, BookAppointmentRequest, BookingResponse, CancellationResponse,
    EmergencyBookingRequest,
};

pub struct AppointmentBookingService {
    state: Arc<AppState>,
    queue_service: QueueService,
    matching_service: DoctorMatchingService,
    directory_service: DoctorDirectoryService,
}

impl AppointmentBookingService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            queue_service: QueueService::new(Arc::clone(&state)),
            matching_service: DoctorMatchingService::new(),
            directory_service: DoctorDirectoryService::new(Arc::clone(&state)),
            state,
        }
    }

    /// Book an appointment and take a queue slot in one atomic unit.
    pub async fn book(
        &self,
        request: BookAppointmentRequest,
    ) -> Result<BookingResponse, AppointmentError> {
        if request.reason.trim().is_empty() {
            return Err(AppointmentError::Validation(
                "a reason for the visit is required".into(),
            ));
        }

        let patient = self
            .state
            .store
            .get_patient(request.patient_id)
            .await
            .map_err(|_| AppointmentError::PatientNotFound(request.patient_id))?;

        let (doctor, match_type) = self.resolve_doctor(&request).await?;

        let language = request
            .language
            .clone()
            .unwrap_or_else(|| patient.preferred_language.clone());

        let (appointment, entry) = self
            .commit_booking(
                &patient,
                &doctor,
                request.reason.trim().to_string(),
                request.symptoms.clone(),
                request.priority,
                request.source,
                language,
            )
            .await?;

        Ok(BookingResponse {
            queue_position: entry.position,
            estimated_wait_minutes: entry.estimated_wait_minutes,
            appointment,
            doctor,
            queue_entry: entry,
            match_type,
        })
    }

    /// Emergency intake: the doctor is auto-assigned (least loaded,
    /// general physician preferred) and the entry takes the head of the
    /// waiting line.
    pub async fn book_emergency(
        &self,
        request: EmergencyBookingRequest,
    ) -> Result<BookingResponse, AppointmentError> {
        if request.reason.trim().is_empty() {
            return Err(AppointmentError::Validation(
                "a reason for the visit is required".into(),
            ));
        }

        let patient = self
            .state
            .store
            .get_patient(request.patient_id)
            .await
            .map_err(|_| AppointmentError::PatientNotFound(request.patient_id))?;

        let candidates = self
            .directory_service
            .list_available_doctors()
            .await
            .map_err(|_| AppointmentError::NoDoctorsAvailable)?;
        let doctor = self
            .matching_service
            .assign_emergency(&candidates)
            .map_err(|_| AppointmentError::NoDoctorsAvailable)?;

        let language = patient.preferred_language.clone();
        let (appointment, entry) = self
            .commit_booking(
                &patient,
                &doctor,
                request.reason.trim().to_string(),
                None,
                PriorityClass::Emergency,
                BookingSource::Emergency,
                language,
            )
            .await?;

        Ok(BookingResponse {
            queue_position: entry.position,
            estimated_wait_minutes: entry.estimated_wait_minutes,
            appointment,
            doctor,
            queue_entry: entry,
            match_type: None,
        })
    }

    pub async fn get(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.state
            .store
            .get_appointment(appointment_id)
            .await
            .map_err(|_| AppointmentError::NotFound(appointment_id))
    }

    /// Cancel an appointment and remove its queue entry, re-numbering
    /// under the same doctor lock insertion uses. Cancelling an already
    /// cancelled appointment is a no-op.
    pub async fn cancel(
        &self,
        appointment_id: Uuid,
    ) -> Result<CancellationResponse, AppointmentError> {
        let appointment = self
            .state
            .store
            .get_appointment(appointment_id)
            .await
            .map_err(|_| AppointmentError::NotFound(appointment_id))?;

        if appointment.status == AppointmentStatus::Cancelled {
            debug!("Appointment {} already cancelled", appointment_id);
            return Ok(CancellationResponse {
                appointment,
                already_cancelled: true,
            });
        }
        if appointment.status.is_terminal() {
            return Err(AppointmentError::AlreadyCompleted(appointment_id));
        }

        let doctor = self
            .state
            .store
            .get_doctor(appointment.doctor_id)
            .await
            .map_err(|_| AppointmentError::DoctorNotFound(appointment.doctor_id))?;

        let mut queue = self
            .queue_service
            .lock_queue(doctor.id)
            .await
            .map_err(AppointmentError::Queue)?;

        // Re-check under the lock: a concurrent cancel may have won the
        // race between the first read and the lock acquisition.
        let appointment = self
            .state
            .store
            .get_appointment(appointment_id)
            .await
            .map_err(|_| AppointmentError::NotFound(appointment_id))?;
        if appointment.status == AppointmentStatus::Cancelled {
            return Ok(CancellationResponse {
                appointment,
                already_cancelled: true,
            });
        }
        if appointment.status.is_terminal() {
            return Err(AppointmentError::AlreadyCompleted(appointment_id));
        }

        self.queue_service.cancel_for_appointment(
            &mut queue,
            appointment_id,
            doctor.consultation_duration_minutes,
        )?;

        let appointment = self
            .state
            .store
            .update_appointment(appointment_id, |a| {
                a.status = AppointmentStatus::Cancelled;
            })
            .await
            .map_err(|_| AppointmentError::NotFound(appointment_id))?;
        drop(queue);

        info!("Cancelled appointment {}", appointment_id);
        Ok(CancellationResponse {
            appointment,
            already_cancelled: false,
        })
    }

    async fn resolve_doctor(
        &self,
        request: &BookAppointmentRequest,
    ) -> Result<(Doctor, Option<MatchType>), AppointmentError> {
        if let Some(doctor_id) = request.doctor_id {
            let doctor = self
                .state
                .store
                .get_doctor(doctor_id)
                .await
                .map_err(|_| AppointmentError::DoctorNotFound(doctor_id))?;
            if !doctor.is_available {
                return Err(AppointmentError::DoctorUnavailable(doctor_id));
            }
            return Ok((doctor, None));
        }

        let available: Vec<Doctor> = self
            .state
            .store
            .list_doctors()
            .await
            .into_iter()
            .filter(|d| d.is_available)
            .collect();

        let hint = request.specialty_hint.as_deref().unwrap_or("");
        let free_text = match &request.symptoms {
            Some(symptoms) => format!("{} {}", request.reason, symptoms),
            None => request.reason.clone(),
        };

        let matched = self
            .matching_service
            .resolve(hint, &free_text, &available)
            .map_err(|_| AppointmentError::NoDoctorsAvailable)?;

        Ok((matched.doctor, Some(matched.match_type)))
    }

    /// The transaction boundary: duplicate check, queue insertion with
    /// re-numbering and the ledger write all happen while holding the
    /// doctor's queue lock. If the queue insert fails nothing is kept.
    #[allow(clippy::too_many_arguments)]
    async fn commit_booking(
        &self,
        patient: &Patient,
        doctor: &Doctor,
        reason: String,
        symptoms: Option<String>,
        priority: PriorityClass,
        source: BookingSource,
        language: String,
    ) -> Result<(Appointment, QueueEntry), AppointmentError> {
        let mut queue = self
            .queue_service
            .lock_queue(doctor.id)
            .await
            .map_err(AppointmentError::Queue)?;

        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            patient_id: patient.id,
            doctor_id: doctor.id,
            reason,
            symptoms,
            priority,
            source,
            language,
            status: AppointmentStatus::Confirmed,
            created_at: now,
            checked_in_at: Some(now),
            consultation_started_at: None,
            consultation_ended_at: None,
        };

        let entry = self
            .queue_service
            .insert_entry(
                &mut queue,
                doctor,
                patient.id,
                Some(appointment.id),
                priority,
            )
            .map_err(|e| match e {
                QueueError::DuplicateBooking { existing } => {
                    AppointmentError::Duplicate { existing }
                }
                other => AppointmentError::Queue(other),
            })?;

        self.state.store.insert_appointment(appointment.clone()).await;
        drop(queue);

        info!(
            "Booked appointment {} for patient {} with doctor {} at position {}",
            appointment.id, patient.id, doctor.id, entry.position
        );
        Ok((appointment, entry))
    }
}
