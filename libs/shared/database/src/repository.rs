use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use shared_models::{Appointment, AppointmentStatus, Doctor, NewAppointment, Patient};

#[derive(Error, Debug)]
pub enum RepositoryError {
    /// The store refused a write because it would place two active appointments of one
    /// doctor closer together than the minimum spacing.
    #[error("Scheduling exclusion violated for doctor {doctor_id}")]
    ExclusionViolation {
        doctor_id: Uuid,
        conflicting_id: Option<Uuid>,
    },

    #[error("Record not found: {0}")]
    NotFound(Uuid),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Persistence for the scheduling and reporting engines.
///
/// Implementations must treat the doctor spacing rule as a storage constraint: inserting
/// or updating an active appointment that lands too close to another active appointment
/// of the same doctor fails with [`RepositoryError::ExclusionViolation`].
#[async_trait]
pub trait ClinicRepository: Send + Sync {
    async fn find_appointment(&self, id: Uuid) -> RepositoryResult<Option<Appointment>>;

    /// Appointments of a doctor ordered by `scheduled_at`, optionally filtered by status.
    async fn find_appointments_by_doctor(
        &self,
        doctor_id: Uuid,
        status: Option<AppointmentStatus>,
    ) -> RepositoryResult<Vec<Appointment>>;

    /// Appointments of a patient ordered by `scheduled_at`.
    async fn find_appointments_by_patient(&self, patient_id: Uuid) -> RepositoryResult<Vec<Appointment>>;

    /// Appointments whose `scheduled_at` lies in `[from, to]`.
    async fn find_appointments_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> RepositoryResult<Vec<Appointment>>;

    async fn find_doctor(&self, id: Uuid) -> RepositoryResult<Option<Doctor>>;

    async fn find_patient(&self, id: Uuid) -> RepositoryResult<Option<Patient>>;

    /// All doctors ordered by last name, first name and id.
    async fn list_doctors(&self) -> RepositoryResult<Vec<Doctor>>;

    /// All patients ordered by last name, first name and id.
    async fn list_patients(&self) -> RepositoryResult<Vec<Patient>>;

    /// Stores a new appointment and returns it with its assigned id.
    async fn insert_appointment(&self, appointment: NewAppointment) -> RepositoryResult<Appointment>;

    /// Replaces a stored appointment. Fails with `NotFound` if the id is unknown.
    async fn update_appointment(&self, appointment: Appointment) -> RepositoryResult<Appointment>;

    /// Returns `false` if nothing was deleted.
    async fn delete_appointment(&self, id: Uuid) -> RepositoryResult<bool>;

    async fn save_doctor(&self, doctor: Doctor) -> RepositoryResult<Doctor>;

    async fn save_patient(&self, patient: Patient) -> RepositoryResult<Patient>;

    /// Returns `false` if nothing was deleted.
    async fn delete_doctor(&self, id: Uuid) -> RepositoryResult<bool>;

    /// Returns `false` if nothing was deleted.
    async fn delete_patient(&self, id: Uuid) -> RepositoryResult<bool>;
}
