use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::ClinicRepository;
use shared_models::Appointment;

use crate::models::{ConflictCheck, EntityKind, SchedulingError};

/// Read-only check for doctor double-booking.
pub struct ConflictValidator {
    repository: Arc<dyn ClinicRepository>,
    min_spacing: Duration,
}

impl ConflictValidator {
    pub fn new(repository: Arc<dyn ClinicRepository>, min_spacing_minutes: i64) -> Self {
        Self {
            repository,
            min_spacing: Duration::minutes(min_spacing_minutes),
        }
    }

    /// Check whether `candidate_time` lands too close to another active appointment of the
    /// same doctor. Patients are not checked: one patient may see two doctors back to back.
    pub async fn check_conflict(
        &self,
        doctor_id: Uuid,
        candidate_time: DateTime<Utc>,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<ConflictCheck, SchedulingError> {
        debug!("Checking conflicts for doctor {} at {}", doctor_id, candidate_time);

        if self.repository.find_doctor(doctor_id).await?.is_none() {
            return Err(SchedulingError::not_found(EntityKind::Doctor, doctor_id));
        }

        let existing_appointments = self
            .repository
            .find_appointments_by_doctor(doctor_id, None)
            .await?;

        let result = match earliest_conflict(
            &existing_appointments,
            candidate_time,
            exclude_appointment_id,
            self.min_spacing,
        ) {
            Some(conflicting_id) => {
                warn!("Conflict detected for doctor {} at {} with appointment {}",
                      doctor_id, candidate_time, conflicting_id);
                ConflictCheck::ConflictWith(conflicting_id)
            }
            None => ConflictCheck::NoConflict,
        };

        Ok(result)
    }
}

/// Earliest active appointment closer than `min_spacing` to `candidate_time`.
/// Ties on time resolve to the smaller id so the answer is stable.
pub fn earliest_conflict(
    appointments: &[Appointment],
    candidate_time: DateTime<Utc>,
    exclude_appointment_id: Option<Uuid>,
    min_spacing: Duration,
) -> Option<Uuid> {
    appointments
        .iter()
        .filter(|apt| apt.is_active())
        .filter(|apt| Some(apt.id) != exclude_appointment_id)
        .filter(|apt| (apt.scheduled_at - candidate_time).abs() < min_spacing)
        .min_by_key(|apt| (apt.scheduled_at, apt.id))
        .map(|apt| apt.id)
}
