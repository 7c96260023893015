// libs/appointment-cell/src/services/scheduling.rs
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use shared_database::{ClinicRepository, RepositoryError};
use shared_models::{Appointment, AppointmentStatus, NewAppointment};
use shared_utils::clock::Clock;

use crate::models::{
    AppointmentChanges, AppointmentDraft, ConflictCheck, EntityKind, SchedulingError,
    ValidatedFields,
};
use crate::services::conflict::ConflictValidator;
use crate::services::lifecycle::AppointmentLifecycle;
use crate::services::locks::{DoctorLocks, SchedulingLockGuard};

/// The only writer of appointment state.
///
/// Conflicts are caught twice: by [`ConflictValidator`] under a per-doctor lock, which
/// yields a precise error, and by the repository's exclusion constraint, which is
/// authoritative when other processes write to the same store.
pub struct SchedulingService {
    repository: Arc<dyn ClinicRepository>,
    conflict_validator: ConflictValidator,
    lifecycle: AppointmentLifecycle,
    locks: DoctorLocks,
    clock: Arc<dyn Clock>,
}

impl SchedulingService {
    pub fn new(
        repository: Arc<dyn ClinicRepository>,
        clock: Arc<dyn Clock>,
        min_spacing_minutes: i64,
    ) -> Self {
        Self {
            conflict_validator: ConflictValidator::new(repository.clone(), min_spacing_minutes),
            repository,
            lifecycle: AppointmentLifecycle::new(),
            locks: DoctorLocks::new(),
            clock,
        }
    }

    /// Book a new appointment in `Scheduled` state.
    #[instrument(skip(self, draft))]
    pub async fn create(&self, draft: AppointmentDraft) -> Result<Appointment, SchedulingError> {
        let fields = draft.validate()?;
        let now = self.clock.now();
        Self::ensure_not_past(fields.scheduled_at, now)?;

        info!("Booking appointment for patient {} with doctor {} at {}",
              fields.patient_id, fields.doctor_id, fields.scheduled_at);

        let _lock = self.locks.acquire(&[fields.doctor_id]).await;

        self.ensure_participants_exist(&fields).await?;
        self.ensure_no_conflict(fields.doctor_id, fields.scheduled_at, None).await?;

        let new_appointment = NewAppointment {
            patient_id: fields.patient_id,
            doctor_id: fields.doctor_id,
            scheduled_at: fields.scheduled_at,
            reason: fields.reason,
            status: AppointmentStatus::Scheduled,
            appointment_type: fields.appointment_type,
            cost: 0.0,
            notes: fields.notes,
            created_at: now,
        };

        let appointment = match self.repository.insert_appointment(new_appointment).await {
            Ok(appointment) => appointment,
            Err(e) => {
                return Err(self
                    .translate_write_error(e, fields.doctor_id, fields.scheduled_at, None)
                    .await)
            }
        };

        info!("Appointment {} booked successfully with doctor {}",
              appointment.id, appointment.doctor_id);
        Ok(appointment)
    }

    /// Replace the editable fields of an appointment. Status, cost and creation time are
    /// preserved; the appointment may move to another time or doctor.
    #[instrument(skip(self, changes))]
    pub async fn update(
        &self,
        appointment_id: Uuid,
        changes: AppointmentChanges,
    ) -> Result<Appointment, SchedulingError> {
        let fields = AppointmentDraft::from(changes).validate()?;
        debug!("Updating appointment: {}", appointment_id);

        let (current, _lock) = self.lock_current(appointment_id, Some(fields.doctor_id)).await?;

        if self.lifecycle.is_terminal(current.status) {
            warn!("Rejected update of appointment {} in status {}", appointment_id, current.status);
            return Err(SchedulingError::InvalidTransition { current: current.status });
        }

        let now = self.clock.now();
        if fields.scheduled_at != current.scheduled_at {
            Self::ensure_not_past(fields.scheduled_at, now)?;
        }

        self.ensure_participants_exist(&fields).await?;
        self.ensure_no_conflict(fields.doctor_id, fields.scheduled_at, Some(appointment_id))
            .await?;

        let updated = Appointment {
            patient_id: fields.patient_id,
            doctor_id: fields.doctor_id,
            scheduled_at: fields.scheduled_at,
            reason: fields.reason,
            appointment_type: fields.appointment_type,
            notes: fields.notes,
            updated_at: Some(now),
            ..current
        };

        let appointment = match self.repository.update_appointment(updated).await {
            Ok(appointment) => appointment,
            Err(e) => {
                return Err(self
                    .translate_write_error(e, fields.doctor_id, fields.scheduled_at, Some(appointment_id))
                    .await)
            }
        };

        info!("Appointment {} updated successfully", appointment_id);
        Ok(appointment)
    }

    #[instrument(skip(self))]
    pub async fn cancel(&self, appointment_id: Uuid) -> Result<Appointment, SchedulingError> {
        debug!("Cancelling appointment: {}", appointment_id);

        let appointment = self
            .apply_transition(appointment_id, |lifecycle, appointment| lifecycle.cancel(appointment))
            .await?;

        info!("Appointment {} cancelled successfully", appointment_id);
        Ok(appointment)
    }

    #[instrument(skip(self))]
    pub async fn complete(
        &self,
        appointment_id: Uuid,
        final_cost: f64,
    ) -> Result<Appointment, SchedulingError> {
        debug!("Completing appointment: {}", appointment_id);

        if !final_cost.is_finite() || final_cost < 0.0 {
            return Err(SchedulingError::Validation(format!(
                "Final cost must be a non-negative amount, got {}",
                final_cost
            )));
        }

        let appointment = self
            .apply_transition(appointment_id, |lifecycle, appointment| {
                lifecycle.complete(appointment)?;
                appointment.cost = final_cost;
                Ok(())
            })
            .await?;

        info!("Appointment {} completed with cost {:.2}", appointment_id, final_cost);
        Ok(appointment)
    }

    /// Administrative hard delete. Ignores the lifecycle.
    #[instrument(skip(self))]
    pub async fn delete(&self, appointment_id: Uuid) -> Result<(), SchedulingError> {
        let deleted = self
            .repository
            .delete_appointment(appointment_id)
            .await
            .map_err(Self::infrastructure)?;

        if !deleted {
            return Err(SchedulingError::not_found(EntityKind::Appointment, appointment_id));
        }

        info!("Appointment {} deleted", appointment_id);
        Ok(())
    }

    pub async fn get(&self, appointment_id: Uuid) -> Result<Appointment, SchedulingError> {
        self.load(appointment_id).await
    }

    /// A doctor's appointments in time order, optionally restricted to one status.
    pub async fn list_for_doctor(
        &self,
        doctor_id: Uuid,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        if self.repository.find_doctor(doctor_id).await.map_err(Self::infrastructure)?.is_none() {
            return Err(SchedulingError::not_found(EntityKind::Doctor, doctor_id));
        }

        self.repository
            .find_appointments_by_doctor(doctor_id, status)
            .await
            .map_err(Self::infrastructure)
    }

    /// A patient's appointments in time order.
    pub async fn list_for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, SchedulingError> {
        if self.repository.find_patient(patient_id).await.map_err(Self::infrastructure)?.is_none() {
            return Err(SchedulingError::not_found(EntityKind::Patient, patient_id));
        }

        self.repository
            .find_appointments_by_patient(patient_id)
            .await
            .map_err(Self::infrastructure)
    }

    pub async fn check_conflict(
        &self,
        doctor_id: Uuid,
        candidate_time: DateTime<Utc>,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<ConflictCheck, SchedulingError> {
        self.conflict_validator
            .check_conflict(doctor_id, candidate_time, exclude_appointment_id)
            .await
    }

    // ==============================================================================
    // PRIVATE HELPER METHODS
    // ==============================================================================

    async fn load(&self, appointment_id: Uuid) -> Result<Appointment, SchedulingError> {
        self.repository
            .find_appointment(appointment_id)
            .await
            .map_err(Self::infrastructure)?
            .ok_or_else(|| SchedulingError::not_found(EntityKind::Appointment, appointment_id))
    }

    /// Lock the appointment's doctor (and `also`, if given) and return the record as read
    /// under that lock. If another writer moved the appointment to a different doctor in
    /// between, the locks are released and taken again for the new doctor.
    async fn lock_current(
        &self,
        appointment_id: Uuid,
        also: Option<Uuid>,
    ) -> Result<(Appointment, SchedulingLockGuard), SchedulingError> {
        let mut locked_doctor = self.load(appointment_id).await?.doctor_id;
        loop {
            let mut doctor_ids = vec![locked_doctor];
            doctor_ids.extend(also);
            let guard = self.locks.acquire(&doctor_ids).await;

            let current = self.load(appointment_id).await?;
            if current.doctor_id == locked_doctor {
                return Ok((current, guard));
            }

            debug!("Appointment {} moved from doctor {} to {} before locking; retrying",
                   appointment_id, locked_doctor, current.doctor_id);
            locked_doctor = current.doctor_id;
        }
    }

    async fn apply_transition<F>(
        &self,
        appointment_id: Uuid,
        transition: F,
    ) -> Result<Appointment, SchedulingError>
    where
        F: FnOnce(&AppointmentLifecycle, &mut Appointment) -> Result<(), SchedulingError>,
    {
        let (mut appointment, _lock) = self.lock_current(appointment_id, None).await?;

        transition(&self.lifecycle, &mut appointment)?;
        appointment.updated_at = Some(self.clock.now());

        Ok(self.repository.update_appointment(appointment).await?)
    }

    fn ensure_not_past(scheduled_at: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), SchedulingError> {
        if scheduled_at < now {
            return Err(SchedulingError::Validation(
                "Appointment must not be scheduled in the past".to_string(),
            ));
        }
        Ok(())
    }

    async fn ensure_participants_exist(&self, fields: &ValidatedFields) -> Result<(), SchedulingError> {
        if self
            .repository
            .find_doctor(fields.doctor_id)
            .await
            .map_err(Self::infrastructure)?
            .is_none()
        {
            return Err(SchedulingError::not_found(EntityKind::Doctor, fields.doctor_id));
        }

        if self
            .repository
            .find_patient(fields.patient_id)
            .await
            .map_err(Self::infrastructure)?
            .is_none()
        {
            return Err(SchedulingError::not_found(EntityKind::Patient, fields.patient_id));
        }

        Ok(())
    }

    async fn ensure_no_conflict(
        &self,
        doctor_id: Uuid,
        scheduled_at: DateTime<Utc>,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<(), SchedulingError> {
        match self
            .conflict_validator
            .check_conflict(doctor_id, scheduled_at, exclude_appointment_id)
            .await?
        {
            ConflictCheck::NoConflict => Ok(()),
            ConflictCheck::ConflictWith(conflicting_id) => {
                Err(SchedulingError::SchedulingConflict { conflicting_id })
            }
        }
    }

    /// Turn a failed write into the caller-facing error. A storage exclusion that does
    /// not name the blocking appointment is resolved by re-running the validator.
    async fn translate_write_error(
        &self,
        err: RepositoryError,
        doctor_id: Uuid,
        scheduled_at: DateTime<Utc>,
        exclude_appointment_id: Option<Uuid>,
    ) -> SchedulingError {
        match err {
            RepositoryError::ExclusionViolation { conflicting_id: None, .. } => {
                warn!("Storage rejected booking for doctor {} at {}", doctor_id, scheduled_at);
                match self
                    .conflict_validator
                    .check_conflict(doctor_id, scheduled_at, exclude_appointment_id)
                    .await
                {
                    Ok(ConflictCheck::ConflictWith(conflicting_id)) => {
                        SchedulingError::SchedulingConflict { conflicting_id }
                    }
                    Ok(ConflictCheck::NoConflict) => SchedulingError::Infrastructure(format!(
                        "Storage reported a scheduling exclusion for doctor {} that is no longer visible",
                        doctor_id
                    )),
                    Err(e) => e,
                }
            }
            other => {
                let translated = SchedulingError::from(other);
                if translated.is_retryable() {
                    error!("Failed to persist appointment: {}", translated);
                }
                translated
            }
        }
    }

    fn infrastructure(err: RepositoryError) -> SchedulingError {
        error!("Repository failure: {}", err);
        SchedulingError::Infrastructure(err.to_string())
    }
}
