use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::{AppState, DoctorQueue, StoreError};
use shared_models::{
    AppointmentStatus, Doctor, PriorityClass, QueueEntry, QueueStatus,
};

use crate::models::{
    QueueEntryView, QueueError, QueuePositionResponse, QueueSnapshot, QueueStatsResponse,
};
use crate::services::scheduler;

pub struct QueueService {
    state: Arc<AppState>,
}

impl QueueService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Acquire the doctor-scoped lock, retrying a bounded number of
    /// times when a concurrent operation holds it. Retry is safe: the
    /// duplicate check runs inside the same critical section.
    pub async fn lock_queue(
        &self,
        doctor_id: Uuid,
    ) -> Result<OwnedMutexGuard<DoctorQueue>, QueueError> {
        let retries = self.state.config.max_txn_retries;

        for attempt in 0..=retries {
            match self.state.store.lock_queue(doctor_id).await {
                Ok(guard) => return Ok(guard),
                Err(StoreError::QueueBusy(_)) if attempt < retries => {
                    warn!(
                        "Queue of doctor {} busy, retrying ({}/{})",
                        doctor_id,
                        attempt + 1,
                        retries
                    );
                    tokio::time::sleep(Duration::from_millis(25 * (attempt as u64 + 1))).await;
                }
                Err(_) => break,
            }
        }

        Err(QueueError::TransactionConflict(doctor_id))
    }

    /// Insert a new entry into an already-locked queue: duplicate guard,
    /// capacity check, slot computation, shift and persist as one unit.
    pub fn insert_entry(
        &self,
        queue: &mut DoctorQueue,
        doctor: &Doctor,
        patient_id: Uuid,
        appointment_id: Option<Uuid>,
        priority: PriorityClass,
    ) -> Result<QueueEntry, QueueError> {
        if let Some(existing) = queue.blocking_entry(patient_id) {
            debug!(
                "Rejecting duplicate booking for patient {} with doctor {}",
                patient_id, doctor.id
            );
            return Err(QueueError::DuplicateBooking {
                existing: existing.clone(),
            });
        }

        if self.state.config.enforce_capacity && queue.active_len() >= doctor.capacity as usize {
            return Err(QueueError::CapacityReached {
                capacity: doctor.capacity,
            });
        }

        let position = scheduler::insertion_position(&queue.entries, priority);
        scheduler::shift_for_insert(&mut queue.entries, position);

        let entry = QueueEntry {
            id: Uuid::new_v4(),
            doctor_id: doctor.id,
            patient_id,
            appointment_id,
            position,
            status: QueueStatus::Waiting,
            priority,
            arrival_time: Utc::now(),
            completed_at: None,
            estimated_wait_minutes: 0,
        };
        queue.entries.push(entry.clone());
        scheduler::refresh_wait_estimates(
            &mut queue.entries,
            doctor.consultation_duration_minutes,
        );

        info!(
            "Queued patient {} with doctor {} at position {} ({})",
            patient_id, doctor.id, position, priority
        );

        // Return the persisted entry, wait estimate included.
        let stored = queue
            .entry_mut(entry.id)
            .expect("entry just inserted")
            .clone();
        Ok(stored)
    }

    /// Cancel the entry linked to an appointment on an already-locked
    /// queue. Returns the cancelled entry, or `None` when no live entry
    /// remains (cancellation is idempotent).
    pub fn cancel_for_appointment(
        &self,
        queue: &mut DoctorQueue,
        appointment_id: Uuid,
        consultation_minutes: i32,
    ) -> Result<Option<QueueEntry>, QueueError> {
        let target = queue
            .entries
            .iter()
            .find(|e| e.appointment_id == Some(appointment_id) && !e.status.is_terminal())
            .map(|e| (e.id, e.status, e.position));

        let Some((entry_id, status, position)) = target else {
            return Ok(None);
        };

        if !status.can_transition_to(&QueueStatus::Cancelled) {
            return Err(QueueError::InvalidTransition {
                from: status,
                to: QueueStatus::Cancelled,
            });
        }

        let entry = queue.entry_mut(entry_id).expect("entry located above");
        entry.status = QueueStatus::Cancelled;
        let cancelled = entry.clone();

        scheduler::close_gap(&mut queue.entries, position);
        scheduler::refresh_wait_estimates(&mut queue.entries, consultation_minutes);

        info!(
            "Cancelled queue entry {} (was position {})",
            entry_id, position
        );
        Ok(Some(cancelled))
    }

    /// Staff-driven status advance. Entries leaving the active set
    /// trigger re-numbering; the linked appointment follows along.
    pub async fn update_entry_status(
        &self,
        doctor_id: Uuid,
        entry_id: Uuid,
        new_status: QueueStatus,
    ) -> Result<QueueEntry, QueueError> {
        let doctor = self
            .state
            .store
            .get_doctor(doctor_id)
            .await
            .map_err(|_| QueueError::DoctorNotFound(doctor_id))?;

        let mut queue = self.lock_queue(doctor_id).await?;

        let entry = queue
            .entry_mut(entry_id)
            .ok_or(QueueError::EntryNotFound(entry_id))?;

        if !entry.status.can_transition_to(&new_status) {
            return Err(QueueError::InvalidTransition {
                from: entry.status,
                to: new_status,
            });
        }

        let was_active = entry.status.is_active();
        let position = entry.position;
        entry.status = new_status;
        if new_status == QueueStatus::Completed {
            entry.completed_at = Some(Utc::now());
        }
        let appointment_id = entry.appointment_id;
        let updated = entry.clone();

        if was_active && !new_status.is_active() {
            scheduler::close_gap(&mut queue.entries, position);
        }
        scheduler::refresh_wait_estimates(
            &mut queue.entries,
            doctor.consultation_duration_minutes,
        );

        drop(queue);

        if let Some(appointment_id) = appointment_id {
            self.sync_appointment(appointment_id, new_status).await;
        }

        info!(
            "Queue entry {} moved to {} for doctor {}",
            entry_id, new_status, doctor_id
        );
        Ok(updated)
    }

    pub async fn get_queue(&self, doctor_id: Uuid) -> Result<QueueSnapshot, QueueError> {
        self.state
            .store
            .get_doctor(doctor_id)
            .await
            .map_err(|_| QueueError::DoctorNotFound(doctor_id))?;

        let queue = self.lock_queue(doctor_id).await?;
        let active = queue.active_sorted();

        let mut views = Vec::with_capacity(active.len());
        for entry in &active {
            views.push(self.entry_view(entry).await);
        }
        let total_waiting = active
            .iter()
            .filter(|e| e.status == QueueStatus::Waiting)
            .count();

        Ok(QueueSnapshot {
            doctor_id,
            queue: views,
            total_waiting,
        })
    }

    pub async fn get_position(
        &self,
        patient_id: Uuid,
        doctor_id: Uuid,
    ) -> Result<QueuePositionResponse, QueueError> {
        self.state
            .store
            .get_doctor(doctor_id)
            .await
            .map_err(|_| QueueError::DoctorNotFound(doctor_id))?;

        let queue = self.lock_queue(doctor_id).await?;
        let entry = queue
            .entries
            .iter()
            .find(|e| e.patient_id == patient_id && e.status.is_active())
            .ok_or(QueueError::NotInQueue)?;

        Ok(QueuePositionResponse {
            position: entry.position,
            status: entry.status,
            estimated_wait_minutes: entry.estimated_wait_minutes,
        })
    }

    pub async fn stats(&self, doctor_id: Uuid) -> Result<QueueStatsResponse, QueueError> {
        self.state
            .store
            .get_doctor(doctor_id)
            .await
            .map_err(|_| QueueError::DoctorNotFound(doctor_id))?;

        let queue = self.lock_queue(doctor_id).await?;
        let waiting: Vec<&QueueEntry> = queue
            .entries
            .iter()
            .filter(|e| e.status == QueueStatus::Waiting)
            .collect();

        let average_wait_minutes = if waiting.is_empty() {
            0
        } else {
            waiting
                .iter()
                .map(|e| e.estimated_wait_minutes)
                .sum::<i32>()
                / waiting.len() as i32
        };

        let today = Utc::now().date_naive();
        let completed_today = queue
            .entries
            .iter()
            .filter(|e| e.completed_at.map(|t| t.date_naive()) == Some(today))
            .count();

        Ok(QueueStatsResponse {
            doctor_id,
            total_waiting: waiting.len(),
            average_wait_minutes,
            completed_today,
        })
    }

    async fn entry_view(&self, entry: &QueueEntry) -> QueueEntryView {
        let patient_name = self
            .state
            .store
            .get_patient(entry.patient_id)
            .await
            .map(|p| p.full_name)
            .unwrap_or_else(|_| "Unknown".to_string());

        QueueEntryView {
            id: entry.id,
            patient_id: entry.patient_id,
            patient_name,
            appointment_id: entry.appointment_id,
            position: entry.position,
            status: entry.status,
            priority: entry.priority,
            arrival_time: entry.arrival_time,
            estimated_wait_minutes: entry.estimated_wait_minutes,
        }
    }

    /// Keep the ledger in step with the live queue. The queue drives
    /// the staff flow; an appointment that cannot follow is logged and
    /// left alone rather than corrupting the queue operation.
    async fn sync_appointment(&self, appointment_id: Uuid, queue_status: QueueStatus) {
        let next = match queue_status {
            QueueStatus::InSession => AppointmentStatus::InProgress,
            QueueStatus::Completed => AppointmentStatus::Completed,
            QueueStatus::Cancelled => AppointmentStatus::Cancelled,
            _ => return,
        };

        let result = self
            .state
            .store
            .update_appointment(appointment_id, |a| {
                if a.status.can_transition_to(&next) {
                    a.status = next;
                    match next {
                        AppointmentStatus::InProgress => {
                            a.consultation_started_at = Some(Utc::now())
                        }
                        AppointmentStatus::Completed => {
                            a.consultation_ended_at = Some(Utc::now())
                        }
                        _ => {}
                    }
                } else {
                    warn!(
                        "Appointment {} cannot move from {} to {}",
                        a.id, a.status, next
                    );
                }
            })
            .await;

        if result.is_err() {
            warn!("Queue entry references missing appointment {}", appointment_id);
        }
    }
}
