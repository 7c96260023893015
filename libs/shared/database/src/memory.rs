use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_models::{Appointment, AppointmentStatus, Doctor, NewAppointment, Patient};

use crate::repository::{ClinicRepository, RepositoryError, RepositoryResult};

#[derive(Default)]
struct Tables {
    doctors: HashMap<Uuid, Doctor>,
    patients: HashMap<Uuid, Patient>,
    appointments: HashMap<Uuid, Appointment>,
}

/// Process-local store. Every write runs under a single write lock, so the spacing
/// exclusion checked here is authoritative for this process.
pub struct InMemoryRepository {
    min_spacing: Duration,
    tables: RwLock<Tables>,
}

impl InMemoryRepository {
    pub fn new(min_spacing_minutes: i64) -> Self {
        Self {
            min_spacing: Duration::minutes(min_spacing_minutes),
            tables: RwLock::new(Tables::default()),
        }
    }

    pub async fn appointment_count(&self) -> usize {
        self.tables.read().await.appointments.len()
    }
}

fn exclusion_conflict(
    tables: &Tables,
    min_spacing: Duration,
    candidate: &Appointment,
) -> Option<Uuid> {
    if !candidate.is_active() {
        return None;
    }

    tables
        .appointments
        .values()
        .filter(|existing| existing.id != candidate.id)
        .filter(|existing| existing.doctor_id == candidate.doctor_id && existing.is_active())
        .filter(|existing| (existing.scheduled_at - candidate.scheduled_at).abs() < min_spacing)
        .min_by_key(|existing| (existing.scheduled_at, existing.id))
        .map(|existing| existing.id)
}

#[async_trait]
impl ClinicRepository for InMemoryRepository {
    async fn find_appointment(&self, id: Uuid) -> RepositoryResult<Option<Appointment>> {
        Ok(self.tables.read().await.appointments.get(&id).cloned())
    }

    async fn find_appointments_by_doctor(
        &self,
        doctor_id: Uuid,
        status: Option<AppointmentStatus>,
    ) -> RepositoryResult<Vec<Appointment>> {
        let tables = self.tables.read().await;
        let mut appointments: Vec<Appointment> = tables
            .appointments
            .values()
            .filter(|apt| apt.doctor_id == doctor_id)
            .filter(|apt| status.map_or(true, |wanted| apt.status == wanted))
            .cloned()
            .collect();

        appointments.sort_by_key(|apt| (apt.scheduled_at, apt.id));
        Ok(appointments)
    }

    async fn find_appointments_by_patient(&self, patient_id: Uuid) -> RepositoryResult<Vec<Appointment>> {
        let tables = self.tables.read().await;
        let mut appointments: Vec<Appointment> = tables
            .appointments
            .values()
            .filter(|apt| apt.patient_id == patient_id)
            .cloned()
            .collect();

        appointments.sort_by_key(|apt| (apt.scheduled_at, apt.id));
        Ok(appointments)
    }

    async fn find_appointments_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> RepositoryResult<Vec<Appointment>> {
        let tables = self.tables.read().await;
        let mut appointments: Vec<Appointment> = tables
            .appointments
            .values()
            .filter(|apt| apt.scheduled_at >= from && apt.scheduled_at <= to)
            .cloned()
            .collect();

        appointments.sort_by_key(|apt| (apt.scheduled_at, apt.id));
        Ok(appointments)
    }

    async fn find_doctor(&self, id: Uuid) -> RepositoryResult<Option<Doctor>> {
        Ok(self.tables.read().await.doctors.get(&id).cloned())
    }

    async fn find_patient(&self, id: Uuid) -> RepositoryResult<Option<Patient>> {
        Ok(self.tables.read().await.patients.get(&id).cloned())
    }

    async fn list_doctors(&self) -> RepositoryResult<Vec<Doctor>> {
        let mut doctors: Vec<Doctor> = self.tables.read().await.doctors.values().cloned().collect();
        doctors.sort_by(|a, b| {
            (&a.last_name, &a.first_name, a.id).cmp(&(&b.last_name, &b.first_name, b.id))
        });
        Ok(doctors)
    }

    async fn list_patients(&self) -> RepositoryResult<Vec<Patient>> {
        let mut patients: Vec<Patient> = self.tables.read().await.patients.values().cloned().collect();
        patients.sort_by(|a, b| {
            (&a.last_name, &a.first_name, a.id).cmp(&(&b.last_name, &b.first_name, b.id))
        });
        Ok(patients)
    }

    async fn insert_appointment(&self, appointment: NewAppointment) -> RepositoryResult<Appointment> {
        let mut tables = self.tables.write().await;
        let appointment = appointment.with_id(Uuid::new_v4());

        if let Some(conflicting_id) = exclusion_conflict(&tables, self.min_spacing, &appointment) {
            warn!("Rejected insert for doctor {}: too close to {}", appointment.doctor_id, conflicting_id);
            return Err(RepositoryError::ExclusionViolation {
                doctor_id: appointment.doctor_id,
                conflicting_id: Some(conflicting_id),
            });
        }

        debug!("Stored appointment {}", appointment.id);
        tables.appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn update_appointment(&self, appointment: Appointment) -> RepositoryResult<Appointment> {
        let mut tables = self.tables.write().await;

        if !tables.appointments.contains_key(&appointment.id) {
            return Err(RepositoryError::NotFound(appointment.id));
        }

        if let Some(conflicting_id) = exclusion_conflict(&tables, self.min_spacing, &appointment) {
            warn!("Rejected update of {}: too close to {}", appointment.id, conflicting_id);
            return Err(RepositoryError::ExclusionViolation {
                doctor_id: appointment.doctor_id,
                conflicting_id: Some(conflicting_id),
            });
        }

        tables.appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn delete_appointment(&self, id: Uuid) -> RepositoryResult<bool> {
        Ok(self.tables.write().await.appointments.remove(&id).is_some())
    }

    async fn save_doctor(&self, doctor: Doctor) -> RepositoryResult<Doctor> {
        self.tables.write().await.doctors.insert(doctor.id, doctor.clone());
        Ok(doctor)
    }

    async fn save_patient(&self, patient: Patient) -> RepositoryResult<Patient> {
        self.tables.write().await.patients.insert(patient.id, patient.clone());
        Ok(patient)
    }

    async fn delete_doctor(&self, id: Uuid) -> RepositoryResult<bool> {
        Ok(self.tables.write().await.doctors.remove(&id).is_some())
    }

    async fn delete_patient(&self, id: Uuid) -> RepositoryResult<bool> {
        Ok(self.tables.write().await.patients.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::TimeZone;
    use shared_models::AppointmentType;

    fn new_appointment(doctor_id: Uuid, at: DateTime<Utc>) -> NewAppointment {
        NewAppointment {
            patient_id: Uuid::new_v4(),
            doctor_id,
            scheduled_at: at,
            reason: "Persistent headache".to_string(),
            status: AppointmentStatus::Scheduled,
            appointment_type: AppointmentType::Primary,
            cost: 0.0,
            notes: None,
            created_at: at,
        }
    }

    #[tokio::test]
    async fn test_insert_enforces_spacing() {
        let repo = InMemoryRepository::new(30);
        let doctor_id = Uuid::new_v4();
        let ten = Utc.with_ymd_and_hms(2024, 1, 10, 10, 0, 0).unwrap();

        let first = repo.insert_appointment(new_appointment(doctor_id, ten)).await.unwrap();
        let result = repo
            .insert_appointment(new_appointment(doctor_id, ten + Duration::minutes(29)))
            .await;

        assert_matches!(
            result,
            Err(RepositoryError::ExclusionViolation { conflicting_id: Some(id), .. }) if id == first.id
        );
        assert!(repo
            .insert_appointment(new_appointment(doctor_id, ten + Duration::minutes(30)))
            .await
            .is_ok());
        assert!(repo
            .insert_appointment(new_appointment(Uuid::new_v4(), ten))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_cancelled_rows_do_not_block() {
        let repo = InMemoryRepository::new(30);
        let doctor_id = Uuid::new_v4();
        let ten = Utc.with_ymd_and_hms(2024, 1, 10, 10, 0, 0).unwrap();

        let mut first = repo.insert_appointment(new_appointment(doctor_id, ten)).await.unwrap();
        first.status = AppointmentStatus::Cancelled;
        repo.update_appointment(first).await.unwrap();

        assert!(repo.insert_appointment(new_appointment(doctor_id, ten)).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_and_delete_unknown_ids() {
        let repo = InMemoryRepository::new(30);
        let ghost = new_appointment(Uuid::new_v4(), Utc::now()).with_id(Uuid::new_v4());

        assert_matches!(repo.update_appointment(ghost.clone()).await, Err(RepositoryError::NotFound(id)) if id == ghost.id);
        assert!(!repo.delete_appointment(ghost.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_range_query_is_inclusive_and_ordered() {
        let repo = InMemoryRepository::new(30);
        let doctor_id = Uuid::new_v4();
        let start = Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 10, 17, 0, 0).unwrap();

        repo.insert_appointment(new_appointment(doctor_id, end)).await.unwrap();
        repo.insert_appointment(new_appointment(doctor_id, start)).await.unwrap();
        repo.insert_appointment(new_appointment(doctor_id, end + Duration::hours(1))).await.unwrap();

        let found = repo.find_appointments_between(start, end).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].scheduled_at, start);
        assert_eq!(found[1].scheduled_at, end);
    }

    fn doctor(last_name: &str) -> Doctor {
        Doctor {
            id: Uuid::new_v4(),
            first_name: "Olga".to_string(),
            last_name: last_name.to_string(),
            middle_name: None,
            specialty: "Neurology".to_string(),
            license_number: "LIC-1".to_string(),
            phone: None,
            email: None,
            schedule: None,
            hire_date: None,
        }
    }

    fn patient(last_name: &str) -> Patient {
        Patient {
            id: Uuid::new_v4(),
            first_name: "Igor".to_string(),
            last_name: last_name.to_string(),
            middle_name: None,
            birth_date: None,
            phone: None,
            email: None,
            address: None,
            insurance_policy: "POL-1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_directory_lists_are_sorted_by_name() {
        let repo = InMemoryRepository::new(30);
        for last_name in ["Volkova", "Antonova", "Lebedeva"] {
            repo.save_doctor(doctor(last_name)).await.unwrap();
            repo.save_patient(patient(last_name)).await.unwrap();
        }

        let doctors: Vec<String> = repo.list_doctors().await.unwrap().into_iter().map(|d| d.last_name).collect();
        assert_eq!(doctors, ["Antonova", "Lebedeva", "Volkova"]);

        let patients: Vec<String> = repo.list_patients().await.unwrap().into_iter().map(|p| p.last_name).collect();
        assert_eq!(patients, ["Antonova", "Lebedeva", "Volkova"]);
    }

    #[tokio::test]
    async fn test_delete_directory_records() {
        let repo = InMemoryRepository::new(30);
        let stored_doctor = repo.save_doctor(doctor("Volkova")).await.unwrap();
        let stored_patient = repo.save_patient(patient("Orlov")).await.unwrap();

        assert!(repo.delete_doctor(stored_doctor.id).await.unwrap());
        assert!(!repo.delete_doctor(stored_doctor.id).await.unwrap());
        assert!(repo.find_doctor(stored_doctor.id).await.unwrap().is_none());

        assert!(repo.delete_patient(stored_patient.id).await.unwrap());
        assert!(!repo.delete_patient(stored_patient.id).await.unwrap());
        assert!(repo.list_patients().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_appointments_by_patient_in_time_order() {
        let repo = InMemoryRepository::new(30);
        let ten = Utc.with_ymd_and_hms(2024, 1, 10, 10, 0, 0).unwrap();
        let patient_id = Uuid::new_v4();

        let later = NewAppointment { patient_id, ..new_appointment(Uuid::new_v4(), ten + Duration::hours(2)) };
        let earlier = NewAppointment { patient_id, ..new_appointment(Uuid::new_v4(), ten) };
        repo.insert_appointment(later).await.unwrap();
        repo.insert_appointment(earlier).await.unwrap();
        repo.insert_appointment(new_appointment(Uuid::new_v4(), ten)).await.unwrap();

        let found = repo.find_appointments_by_patient(patient_id).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].scheduled_at, ten);
        assert!(found.iter().all(|apt| apt.patient_id == patient_id));
    }
}
