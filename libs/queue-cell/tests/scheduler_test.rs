use chrono::Utc;
use uuid::Uuid;

use queue_cell::services::scheduler;
use shared_models::{PriorityClass, QueueEntry, QueueStatus};

fn entry(position: i32, status: QueueStatus, priority: PriorityClass) -> QueueEntry {
    QueueEntry {
        id: Uuid::new_v4(),
        doctor_id: Uuid::nil(),
        patient_id: Uuid::new_v4(),
        appointment_id: None,
        position,
        status,
        priority,
        arrival_time: Utc::now(),
        completed_at: None,
        estimated_wait_minutes: 0,
    }
}

fn insert(entries: &mut Vec<QueueEntry>, priority: PriorityClass) -> QueueEntry {
    let position = scheduler::insertion_position(entries, priority);
    scheduler::shift_for_insert(entries, position);
    let new_entry = entry(position, QueueStatus::Waiting, priority);
    entries.push(new_entry.clone());
    scheduler::refresh_wait_estimates(entries, 10);
    new_entry
}

fn active_positions(entries: &[QueueEntry]) -> Vec<i32> {
    let mut positions: Vec<i32> = entries
        .iter()
        .filter(|e| e.status.is_active())
        .map(|e| e.position)
        .collect();
    positions.sort();
    positions
}

fn assert_dense(entries: &[QueueEntry]) {
    let positions = active_positions(entries);
    let expected: Vec<i32> = (1..=positions.len() as i32).collect();
    assert_eq!(positions, expected, "active positions must be exactly 1..n");
}

#[test]
fn normal_bookings_append_in_arrival_order() {
    let mut entries = Vec::new();

    let first = insert(&mut entries, PriorityClass::Normal);
    let second = insert(&mut entries, PriorityClass::Normal);

    assert_eq!(first.position, 1);
    assert_eq!(second.position, 2);
    assert_dense(&entries);
}

#[test]
fn emergency_preempts_all_waiting_entries() {
    let mut entries = Vec::new();
    insert(&mut entries, PriorityClass::Normal);
    insert(&mut entries, PriorityClass::Normal);

    let emergency = insert(&mut entries, PriorityClass::Emergency);

    assert_eq!(emergency.position, 1);
    let normals: Vec<i32> = entries
        .iter()
        .filter(|e| e.priority == PriorityClass::Normal)
        .map(|e| e.position)
        .collect();
    assert_eq!(normals, vec![2, 3]);
    assert_dense(&entries);
}

#[test]
fn emergency_does_not_displace_in_session_entry() {
    // P1 was promoted to InSession at position 1, P2 waits at 2.
    let mut entries = vec![
        entry(1, QueueStatus::InSession, PriorityClass::Emergency),
        entry(2, QueueStatus::Waiting, PriorityClass::Normal),
    ];
    let in_session_id = entries[0].id;

    let emergency = insert(&mut entries, PriorityClass::Emergency);

    // Emergency slots in ahead of the waiting patient only.
    assert_eq!(emergency.position, 2);
    let in_session = entries.iter().find(|e| e.id == in_session_id).unwrap();
    assert_eq!(in_session.position, 1);
    assert_eq!(in_session.status, QueueStatus::InSession);
    let waiting_normal = entries
        .iter()
        .find(|e| e.priority == PriorityClass::Normal)
        .unwrap();
    assert_eq!(waiting_normal.position, 3);
    assert_dense(&entries);
}

#[test]
fn insertion_cascades_around_mid_queue_session() {
    // Staff called P2 out of order, so the session runs at position 2.
    let mut entries = vec![
        entry(1, QueueStatus::Waiting, PriorityClass::Normal),
        entry(2, QueueStatus::InSession, PriorityClass::Normal),
        entry(3, QueueStatus::Waiting, PriorityClass::Normal),
    ];
    let in_session_id = entries[1].id;

    let emergency = insert(&mut entries, PriorityClass::Emergency);

    assert_eq!(emergency.position, 1);
    let in_session = entries.iter().find(|e| e.id == in_session_id).unwrap();
    assert_eq!(in_session.position, 2);
    // The displaced waiting entries skip over the pinned slot.
    let mut waiting: Vec<i32> = entries
        .iter()
        .filter(|e| e.status == QueueStatus::Waiting && e.priority == PriorityClass::Normal)
        .map(|e| e.position)
        .collect();
    waiting.sort();
    assert_eq!(waiting, vec![3, 4]);
    assert_dense(&entries);
}

#[test]
fn high_priority_queues_behind_emergencies_ahead_of_normal() {
    let mut entries = Vec::new();
    insert(&mut entries, PriorityClass::Emergency);
    insert(&mut entries, PriorityClass::Normal);

    let high = insert(&mut entries, PriorityClass::High);

    assert_eq!(high.position, 2);
    assert_dense(&entries);

    // A second high entry keeps FIFO within the tier.
    let second_high = insert(&mut entries, PriorityClass::High);
    assert_eq!(second_high.position, 3);
    assert_dense(&entries);
}

#[test]
fn high_priority_on_empty_queue_takes_front() {
    let mut entries = Vec::new();
    let high = insert(&mut entries, PriorityClass::High);
    assert_eq!(high.position, 1);
}

#[test]
fn removal_closes_the_gap() {
    let mut entries = Vec::new();
    insert(&mut entries, PriorityClass::Normal);
    let middle = insert(&mut entries, PriorityClass::Normal);
    insert(&mut entries, PriorityClass::Normal);

    let removed_pos = middle.position;
    let target = entries.iter_mut().find(|e| e.id == middle.id).unwrap();
    target.status = QueueStatus::Cancelled;
    scheduler::close_gap(&mut entries, removed_pos);
    scheduler::refresh_wait_estimates(&mut entries, 10);

    assert_dense(&entries);

    // Next booking fills the freed tail slot.
    let next = insert(&mut entries, PriorityClass::Normal);
    assert_eq!(next.position, 3);
}

#[test]
fn emptied_queue_restarts_at_position_one() {
    let mut entries = Vec::new();
    let only = insert(&mut entries, PriorityClass::Normal);

    let target = entries.iter_mut().find(|e| e.id == only.id).unwrap();
    target.status = QueueStatus::Completed;
    scheduler::close_gap(&mut entries, only.position);

    let next = insert(&mut entries, PriorityClass::Normal);
    assert_eq!(next.position, 1);
}

#[test]
fn priority_ordering_holds_across_mixed_sequences() {
    let mut entries = Vec::new();
    for priority in [
        PriorityClass::Normal,
        PriorityClass::Emergency,
        PriorityClass::High,
        PriorityClass::Normal,
        PriorityClass::Emergency,
        PriorityClass::High,
        PriorityClass::Normal,
    ] {
        insert(&mut entries, priority);
        assert_dense(&entries);
    }

    let mut active: Vec<&QueueEntry> =
        entries.iter().filter(|e| e.status.is_active()).collect();
    active.sort_by_key(|e| e.position);

    for pair in active.windows(2) {
        assert!(
            pair[0].priority >= pair[1].priority,
            "higher priority must sit ahead: {:?} before {:?}",
            pair[0].priority,
            pair[1].priority
        );
    }
}

#[test]
fn fifo_within_same_priority_class() {
    let mut entries = Vec::new();
    let first = insert(&mut entries, PriorityClass::Emergency);
    let second = insert(&mut entries, PriorityClass::Emergency);
    let third = insert(&mut entries, PriorityClass::Emergency);

    let pos = |id| entries.iter().find(|e| e.id == id).unwrap().position;
    assert!(pos(first.id) < pos(second.id));
    assert!(pos(second.id) < pos(third.id));
}

#[test]
fn wait_estimates_follow_position() {
    let mut entries = Vec::new();
    insert(&mut entries, PriorityClass::Normal);
    insert(&mut entries, PriorityClass::Normal);
    insert(&mut entries, PriorityClass::Normal);

    let mut active: Vec<&QueueEntry> =
        entries.iter().filter(|e| e.status.is_active()).collect();
    active.sort_by_key(|e| e.position);

    assert_eq!(active[0].estimated_wait_minutes, 0);
    assert_eq!(active[1].estimated_wait_minutes, 10);
    assert_eq!(active[2].estimated_wait_minutes, 20);
}
