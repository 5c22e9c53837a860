use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use appointment_cell::models::{
    AppointmentError, BookAppointmentRequest, EmergencyBookingRequest,
};
use appointment_cell::services::AppointmentBookingService;
use doctor_cell::models::MatchType;
use queue_cell::services::QueueService;
use shared_config::AppConfig;
use shared_database::AppState;
use shared_models::{
    AppointmentStatus, BookingSource, Doctor, Patient, PriorityClass, QueueStatus,
};

fn test_state() -> Arc<AppState> {
    AppState::shared(AppConfig::default())
}

fn test_doctor(name: &str, specialty: &str) -> Doctor {
    let now = Utc::now();
    Doctor {
        id: Uuid::new_v4(),
        full_name: name.to_string(),
        specialty: specialty.to_string(),
        room: "101".to_string(),
        capacity: 20,
        consultation_duration_minutes: 10,
        is_available: true,
        created_at: now,
        updated_at: now,
    }
}

fn test_patient(name: &str) -> Patient {
    Patient {
        id: Uuid::new_v4(),
        full_name: name.to_string(),
        phone: None,
        preferred_language: "en".to_string(),
        created_at: Utc::now(),
    }
}

fn booking(patient: &Patient, doctor: &Doctor) -> BookAppointmentRequest {
    BookAppointmentRequest {
        patient_id: patient.id,
        doctor_id: Some(doctor.id),
        specialty_hint: None,
        reason: "fever and cough".to_string(),
        symptoms: None,
        priority: PriorityClass::Normal,
        source: BookingSource::Manual,
        language: None,
    }
}

#[tokio::test]
async fn booking_creates_ledger_entry_and_queue_slot() {
    let state = test_state();
    let service = AppointmentBookingService::new(Arc::clone(&state));
    let doctor = test_doctor("Dr Kavya Nair", "General Medicine");
    let p1 = test_patient("P1");
    let p2 = test_patient("P2");
    state.store.insert_doctor(doctor.clone()).await;
    state.store.insert_patient(p1.clone()).await;
    state.store.insert_patient(p2.clone()).await;

    let first = service.book(booking(&p1, &doctor)).await.unwrap();
    assert_eq!(first.queue_position, 1);
    assert_eq!(first.appointment.status, AppointmentStatus::Confirmed);
    assert!(first.appointment.checked_in_at.is_some());
    assert_eq!(first.queue_entry.appointment_id, Some(first.appointment.id));
    assert_eq!(first.match_type, None);

    let second = service.book(booking(&p2, &doctor)).await.unwrap();
    assert_eq!(second.queue_position, 2);
    assert_eq!(second.estimated_wait_minutes, 10);
}

#[tokio::test]
async fn duplicate_booking_reports_the_existing_entry() {
    let state = test_state();
    let service = AppointmentBookingService::new(Arc::clone(&state));
    let doctor = test_doctor("Dr Kavya Nair", "General Medicine");
    let patient = test_patient("P1");
    state.store.insert_doctor(doctor.clone()).await;
    state.store.insert_patient(patient.clone()).await;

    let first = service.book(booking(&patient, &doctor)).await.unwrap();
    let err = service.book(booking(&patient, &doctor)).await.unwrap_err();

    assert_matches!(
        err,
        AppointmentError::Duplicate { ref existing } if existing.id == first.queue_entry.id
    );

    // The queue is unchanged.
    let queue_service = QueueService::new(state);
    let snapshot = queue_service.get_queue(doctor.id).await.unwrap();
    assert_eq!(snapshot.queue.len(), 1);
}

#[tokio::test]
async fn emergency_booking_takes_the_head_of_the_queue() {
    let state = test_state();
    let service = AppointmentBookingService::new(Arc::clone(&state));
    let doctor = test_doctor("Dr Kavya Nair", "General Medicine");
    let p1 = test_patient("P1");
    let p2 = test_patient("P2");
    let p3 = test_patient("P3");
    state.store.insert_doctor(doctor.clone()).await;
    for p in [&p1, &p2, &p3] {
        state.store.insert_patient((*p).clone()).await;
    }

    service.book(booking(&p1, &doctor)).await.unwrap();
    service.book(booking(&p2, &doctor)).await.unwrap();

    let emergency = service
        .book_emergency(EmergencyBookingRequest {
            patient_id: p3.id,
            reason: "chest pain".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(emergency.queue_position, 1);
    assert_eq!(emergency.appointment.priority, PriorityClass::Emergency);
    assert_eq!(emergency.appointment.source, BookingSource::Emergency);

    let queue_service = QueueService::new(state);
    let snapshot = queue_service.get_queue(doctor.id).await.unwrap();
    let order: Vec<(Uuid, i32)> = snapshot
        .queue
        .iter()
        .map(|e| (e.patient_id, e.position))
        .collect();
    assert_eq!(order, vec![(p3.id, 1), (p1.id, 2), (p2.id, 3)]);
}

#[tokio::test]
async fn emergency_assignment_prefers_quiet_generalist() {
    let state = test_state();
    let service = AppointmentBookingService::new(Arc::clone(&state));
    let cardio = test_doctor("Dr Meera Sharma", "Cardiology");
    let general = test_doctor("Dr Kavya Nair", "General Medicine");
    let p1 = test_patient("P1");
    let p2 = test_patient("P2");
    state.store.insert_doctor(cardio.clone()).await;
    state.store.insert_doctor(general.clone()).await;
    state.store.insert_patient(p1.clone()).await;
    state.store.insert_patient(p2.clone()).await;

    // The generalist already has one patient queued; they are still
    // preferred over an idle specialist.
    service.book(booking(&p1, &general)).await.unwrap();

    let emergency = service
        .book_emergency(EmergencyBookingRequest {
            patient_id: p2.id,
            reason: "collapsed at reception".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(emergency.doctor.id, general.id);
    assert_eq!(emergency.queue_position, 1);
}

#[tokio::test]
async fn matcher_resolves_doctor_from_specialty_hint() {
    let state = test_state();
    let service = AppointmentBookingService::new(Arc::clone(&state));
    let cardio = test_doctor("Dr Meera Sharma", "Cardiology");
    let general = test_doctor("Dr Kavya Nair", "General Medicine");
    let patient = test_patient("P1");
    state.store.insert_doctor(cardio.clone()).await;
    state.store.insert_doctor(general.clone()).await;
    state.store.insert_patient(patient.clone()).await;

    let response = service
        .book(BookAppointmentRequest {
            patient_id: patient.id,
            doctor_id: None,
            specialty_hint: Some("cardio".to_string()),
            reason: "heart palpitations".to_string(),
            symptoms: None,
            priority: PriorityClass::Normal,
            source: BookingSource::Voice,
            language: None,
        })
        .await
        .unwrap();

    assert_eq!(response.doctor.id, cardio.id);
    assert_eq!(response.match_type, Some(MatchType::Specialty));
}

#[tokio::test]
async fn cancellation_renumbers_and_is_idempotent() {
    let state = test_state();
    let service = AppointmentBookingService::new(Arc::clone(&state));
    let doctor = test_doctor("Dr Kavya Nair", "General Medicine");
    let p1 = test_patient("P1");
    let p2 = test_patient("P2");
    state.store.insert_doctor(doctor.clone()).await;
    state.store.insert_patient(p1.clone()).await;
    state.store.insert_patient(p2.clone()).await;

    let first = service.book(booking(&p1, &doctor)).await.unwrap();
    let second = service.book(booking(&p2, &doctor)).await.unwrap();
    assert_eq!(second.queue_position, 2);

    let cancelled = service.cancel(first.appointment.id).await.unwrap();
    assert!(!cancelled.already_cancelled);
    assert_eq!(cancelled.appointment.status, AppointmentStatus::Cancelled);

    let queue_service = QueueService::new(Arc::clone(&state));
    let snapshot = queue_service.get_queue(doctor.id).await.unwrap();
    assert_eq!(snapshot.queue.len(), 1);
    assert_eq!(snapshot.queue[0].patient_id, p2.id);
    assert_eq!(snapshot.queue[0].position, 1);

    // Cancelling again is a no-op.
    let again = service.cancel(first.appointment.id).await.unwrap();
    assert!(again.already_cancelled);
    let snapshot = queue_service.get_queue(doctor.id).await.unwrap();
    assert_eq!(snapshot.queue.len(), 1);
    assert_eq!(snapshot.queue[0].position, 1);

    // The patient may book again after cancelling.
    let rebooked = service.book(booking(&p1, &doctor)).await.unwrap();
    assert_eq!(rebooked.queue_position, 2);
}

#[tokio::test]
async fn concurrent_cancels_have_one_effective_winner() {
    let state = test_state();
    let service = AppointmentBookingService::new(Arc::clone(&state));
    let doctor = test_doctor("Dr Kavya Nair", "General Medicine");
    let patient = test_patient("P1");
    state.store.insert_doctor(doctor.clone()).await;
    state.store.insert_patient(patient.clone()).await;

    let booked = service.book(booking(&patient, &doctor)).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..2 {
        let state = Arc::clone(&state);
        let appointment_id = booked.appointment.id;
        handles.push(tokio::spawn(async move {
            let service = AppointmentBookingService::new(state);
            service.cancel(appointment_id).await
        }));
    }

    let results: Vec<_> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|r| r.unwrap().unwrap())
        .collect();

    let effective = results.iter().filter(|r| !r.already_cancelled).count();
    assert_eq!(effective, 1);
    for r in &results {
        assert_eq!(r.appointment.status, AppointmentStatus::Cancelled);
    }

    let queue_service = QueueService::new(state);
    let snapshot = queue_service.get_queue(doctor.id).await.unwrap();
    assert!(snapshot.queue.is_empty());
}

#[tokio::test]
async fn completed_appointment_cannot_be_cancelled() {
    let state = test_state();
    let service = AppointmentBookingService::new(Arc::clone(&state));
    let doctor = test_doctor("Dr Kavya Nair", "General Medicine");
    let patient = test_patient("P1");
    state.store.insert_doctor(doctor.clone()).await;
    state.store.insert_patient(patient.clone()).await;

    let booked = service.book(booking(&patient, &doctor)).await.unwrap();

    let queue_service = QueueService::new(Arc::clone(&state));
    let entry_id = booked.queue_entry.id;
    for status in [
        QueueStatus::Called,
        QueueStatus::InSession,
        QueueStatus::Completed,
    ] {
        queue_service
            .update_entry_status(doctor.id, entry_id, status)
            .await
            .unwrap();
    }

    // The ledger followed the queue through the consultation.
    let appointment = service.get(booked.appointment.id).await.unwrap();
    assert_eq!(appointment.status, AppointmentStatus::Completed);
    assert!(appointment.consultation_started_at.is_some());
    assert!(appointment.consultation_ended_at.is_some());

    let err = service.cancel(booked.appointment.id).await.unwrap_err();
    assert_matches!(err, AppointmentError::AlreadyCompleted(_));
}

#[tokio::test]
async fn concurrent_bookings_for_same_patient_yield_one_entry() {
    let state = test_state();
    let doctor = test_doctor("Dr Kavya Nair", "General Medicine");
    let patient = test_patient("P1");
    state.store.insert_doctor(doctor.clone()).await;
    state.store.insert_patient(patient.clone()).await;

    let mut handles = Vec::new();
    for _ in 0..2 {
        let state = Arc::clone(&state);
        let patient = patient.clone();
        let doctor = doctor.clone();
        handles.push(tokio::spawn(async move {
            let service = AppointmentBookingService::new(state);
            service.book(booking(&patient, &doctor)).await
        }));
    }

    let results: Vec<_> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    let successes = results.iter().filter(|r| r.is_ok()).count();
    let duplicates = results
        .iter()
        .filter(|r| matches!(r, Err(AppointmentError::Duplicate { .. })))
        .count();
    assert_eq!(successes, 1);
    assert_eq!(duplicates, 1);

    let queue_service = QueueService::new(state);
    let snapshot = queue_service.get_queue(doctor.id).await.unwrap();
    assert_eq!(snapshot.queue.len(), 1);
    assert_eq!(snapshot.queue[0].position, 1);
}

#[tokio::test]
async fn unknown_references_are_rejected() {
    let state = test_state();
    let service = AppointmentBookingService::new(Arc::clone(&state));
    let doctor = test_doctor("Dr Kavya Nair", "General Medicine");
    let patient = test_patient("P1");
    state.store.insert_doctor(doctor.clone()).await;
    state.store.insert_patient(patient.clone()).await;

    let ghost = test_patient("Ghost");
    let err = service.book(booking(&ghost, &doctor)).await.unwrap_err();
    assert_matches!(err, AppointmentError::PatientNotFound(_));

    let missing = test_doctor("Dr Nobody", "Cardiology");
    let err = service.book(booking(&patient, &missing)).await.unwrap_err();
    assert_matches!(err, AppointmentError::DoctorNotFound(_));
}

#[test]
fn loose_upstream_field_names_normalize_at_the_boundary() {
    // Voice payloads spell the fields differently; the request type
    // absorbs them so only one shape reaches the scheduler.
    let request: BookAppointmentRequest = serde_json::from_value(json!({
        "patient_id": Uuid::new_v4(),
        "specialization": "cardiology",
        "reason": "chest pain",
        "urgency": "urgent",
        "source": "voice",
        "lang": "hi"
    }))
    .unwrap();

    assert_eq!(request.specialty_hint.as_deref(), Some("cardiology"));
    assert_eq!(request.priority, PriorityClass::High);
    assert_eq!(request.source, BookingSource::Voice);
    assert_eq!(request.language.as_deref(), Some("hi"));
}
