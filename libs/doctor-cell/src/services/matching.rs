use tracing::{debug, info};

use shared_models::Doctor;

use crate::models::{DoctorError, DoctorMatch, DoctorWithQueueCount, MatchType};

/// Resolves a free-text or spoken booking request to a specific doctor.
///
/// Voice transcripts are noisy; an explicit name mention is the most
/// specific signal a caller can give, so it takes precedence over the
/// AI-extracted specialty hint.
pub struct DoctorMatchingService;

impl DoctorMatchingService {
    pub fn new() -> Self {
        Self
    }

    /// Strict priority order: name mention, then specialty hint, then
    /// general-physician fallback. Fails only on an empty directory.
    pub fn resolve(
        &self,
        specialty_hint: &str,
        free_text: &str,
        doctors: &[Doctor],
    ) -> Result<DoctorMatch, DoctorError> {
        if doctors.is_empty() {
            return Err(DoctorError::NoDoctorsAvailable);
        }

        let text = free_text.to_lowercase();
        if !text.is_empty() {
            for doctor in doctors {
                if doctor
                    .name_parts()
                    .any(|part| text.contains(&part.to_lowercase()))
                {
                    info!(
                        "Matched doctor {} by name mention",
                        doctor.full_name
                    );
                    return Ok(DoctorMatch {
                        doctor: doctor.clone(),
                        match_type: MatchType::Name,
                    });
                }
            }
        }

        let hint = specialty_hint.trim().to_lowercase();
        if !hint.is_empty() {
            for doctor in doctors {
                if doctor.specialty.to_lowercase().contains(&hint) {
                    info!(
                        "Matched doctor {} by specialty '{}'",
                        doctor.full_name, doctor.specialty
                    );
                    return Ok(DoctorMatch {
                        doctor: doctor.clone(),
                        match_type: MatchType::Specialty,
                    });
                }
            }
        }

        let fallback = doctors
            .iter()
            .find(|d| d.is_general_physician())
            .unwrap_or(&doctors[0]);

        debug!("Falling back to doctor {}", fallback.full_name);
        Ok(DoctorMatch {
            doctor: fallback.clone(),
            match_type: MatchType::Fallback,
        })
    }

    /// Doctor auto-assignment for emergency bookings: least-loaded wins,
    /// general physicians preferred, directory order breaks ties.
    pub fn assign_emergency(
        &self,
        doctors: &[DoctorWithQueueCount],
    ) -> Result<Doctor, DoctorError> {
        if doctors.is_empty() {
            return Err(DoctorError::NoDoctorsAvailable);
        }

        let pick = |candidates: &mut dyn Iterator<Item = &DoctorWithQueueCount>| {
            candidates.min_by_key(|d| d.queue_count).cloned()
        };

        let chosen = pick(&mut doctors.iter().filter(|d| d.doctor.is_general_physician()))
            .or_else(|| pick(&mut doctors.iter()))
            .ok_or(DoctorError::NoDoctorsAvailable)?;

        info!(
            "Emergency assigned to doctor {} (queue depth {})",
            chosen.doctor.full_name, chosen.queue_count
        );
        Ok(chosen.doctor)
    }
}

impl Default for DoctorMatchingService {
    fn default() -> Self {
        Self::new()
    }
}
