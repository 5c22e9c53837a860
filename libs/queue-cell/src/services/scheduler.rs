//! Priority scheduler: pure position arithmetic over one doctor's queue.
//!
//! Callers hold the doctor-scoped lock while applying these functions,
//! so every insertion/removal and its re-numbering commits as a unit.

use shared_models::{PriorityClass, QueueEntry, QueueStatus};

/// Compute the 1-based slot a new entry of the given priority takes.
///
/// - emergency: ahead of every waiting patient, but never displacing a
///   consultation already in progress (or a patient already called in);
/// - high/urgent: behind the leading run of waiting emergencies, ahead
///   of everything normal;
/// - normal: append to the end of the active set.
pub fn insertion_position(entries: &[QueueEntry], priority: PriorityClass) -> i32 {
    let mut active: Vec<&QueueEntry> = entries.iter().filter(|e| e.status.is_active()).collect();
    active.sort_by_key(|e| e.position);

    // The new entry slots in behind the leading run of entries it may
    // not displace: patients already called in or in session, and
    // waiting patients of the same or a higher priority tier (FIFO
    // within a tier). For normal priority that run is the whole active
    // set, i.e. a plain append.
    let front_run = active
        .iter()
        .take_while(|e| e.status != QueueStatus::Waiting || e.priority >= priority)
        .count();
    front_run as i32 + 1
}

/// Make room at `insert_pos`. Entries already in session are pinned at
/// their position; every other active entry at or past the slot cascades
/// into the next position not held by a pinned entry, keeping the
/// numbering dense even when a consultation runs mid-queue.
pub fn shift_for_insert(entries: &mut [QueueEntry], insert_pos: i32) {
    let pinned: Vec<i32> = entries
        .iter()
        .filter(|e| e.status == QueueStatus::InSession)
        .map(|e| e.position)
        .collect();

    let mut indices: Vec<usize> = (0..entries.len())
        .filter(|&i| {
            let e = &entries[i];
            e.status.is_active()
                && e.status != QueueStatus::InSession
                && e.position >= insert_pos
        })
        .collect();
    indices.sort_by_key(|&i| entries[i].position);

    let mut next = insert_pos;
    for i in indices {
        next += 1;
        while pinned.contains(&next) {
            next += 1;
        }
        entries[i].position = next;
    }
}

/// Close the gap left by an entry that dropped out of the active set at
/// `removed_pos`, keeping positions dense.
pub fn close_gap(entries: &mut [QueueEntry], removed_pos: i32) {
    let mut indices: Vec<usize> = (0..entries.len())
        .filter(|&i| entries[i].status.is_active() && entries[i].position > removed_pos)
        .collect();
    indices.sort_by_key(|&i| entries[i].position);

    for i in indices {
        entries[i].position -= 1;
    }
}

/// Informational only: waiting patients see (position - 1) consultation
/// slots ahead of them.
pub fn refresh_wait_estimates(entries: &mut [QueueEntry], consultation_minutes: i32) {
    for entry in entries.iter_mut() {
        entry.estimated_wait_minutes = match entry.status {
            QueueStatus::Waiting | QueueStatus::Called => {
                (entry.position - 1).max(0) * consultation_minutes
            }
            _ => 0,
        };
    }
}
