use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::ClinicRepository;
use shared_models::{Doctor, Patient};

use crate::models::{EntityKind, SchedulingError};

/// Administrative registration of doctors and patients. Only required-field presence is
/// enforced here. Records that appointments still reference cannot be deleted.
pub struct ClinicDirectoryService {
    repository: Arc<dyn ClinicRepository>,
}

impl ClinicDirectoryService {
    pub fn new(repository: Arc<dyn ClinicRepository>) -> Self {
        Self { repository }
    }

    pub async fn register_doctor(&self, mut doctor: Doctor) -> Result<Doctor, SchedulingError> {
        reject_missing(doctor.missing_fields())?;
        if doctor.id.is_nil() {
            doctor.id = Uuid::new_v4();
        }

        let doctor = self.repository.save_doctor(doctor).await?;
        info!("Doctor {} registered ({})", doctor.id, doctor.specialty);
        Ok(doctor)
    }

    pub async fn register_patient(&self, mut patient: Patient) -> Result<Patient, SchedulingError> {
        reject_missing(patient.missing_fields())?;
        if patient.id.is_nil() {
            patient.id = Uuid::new_v4();
        }

        let patient = self.repository.save_patient(patient).await?;
        info!("Patient {} registered", patient.id);
        Ok(patient)
    }

    pub async fn get_doctor(&self, doctor_id: Uuid) -> Result<Doctor, SchedulingError> {
        debug!("Fetching doctor: {}", doctor_id);
        self.repository
            .find_doctor(doctor_id)
            .await?
            .ok_or_else(|| SchedulingError::not_found(EntityKind::Doctor, doctor_id))
    }

    pub async fn get_patient(&self, patient_id: Uuid) -> Result<Patient, SchedulingError> {
        debug!("Fetching patient: {}", patient_id);
        self.repository
            .find_patient(patient_id)
            .await?
            .ok_or_else(|| SchedulingError::not_found(EntityKind::Patient, patient_id))
    }

    pub async fn list_doctors(&self) -> Result<Vec<Doctor>, SchedulingError> {
        Ok(self.repository.list_doctors().await?)
    }

    pub async fn list_patients(&self) -> Result<Vec<Patient>, SchedulingError> {
        Ok(self.repository.list_patients().await?)
    }

    pub async fn delete_doctor(&self, doctor_id: Uuid) -> Result<(), SchedulingError> {
        self.get_doctor(doctor_id).await?;

        if !self
            .repository
            .find_appointments_by_doctor(doctor_id, None)
            .await?
            .is_empty()
        {
            warn!("Refused to delete doctor {} with appointments", doctor_id);
            return Err(SchedulingError::HasAppointments { entity: EntityKind::Doctor, id: doctor_id });
        }

        if !self.repository.delete_doctor(doctor_id).await? {
            return Err(SchedulingError::not_found(EntityKind::Doctor, doctor_id));
        }

        info!("Doctor {} deleted", doctor_id);
        Ok(())
    }

    pub async fn delete_patient(&self, patient_id: Uuid) -> Result<(), SchedulingError> {
        self.get_patient(patient_id).await?;

        if !self
            .repository
            .find_appointments_by_patient(patient_id)
            .await?
            .is_empty()
        {
            warn!("Refused to delete patient {} with appointments", patient_id);
            return Err(SchedulingError::HasAppointments { entity: EntityKind::Patient, id: patient_id });
        }

        if !self.repository.delete_patient(patient_id).await? {
            return Err(SchedulingError::not_found(EntityKind::Patient, patient_id));
        }

        info!("Patient {} deleted", patient_id);
        Ok(())
    }
}

fn reject_missing(missing: Vec<&'static str>) -> Result<(), SchedulingError> {
    if missing.is_empty() {
        return Ok(());
    }
    Err(SchedulingError::Validation(format!(
        "Missing required fields: {}",
        missing.join(", ")
    )))
}
