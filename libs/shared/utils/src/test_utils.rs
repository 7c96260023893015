use std::sync::Arc;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{ClinicRepository, InMemoryRepository};
use shared_models::{Doctor, Patient};

use crate::clock::FixedClock;

pub struct TestConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: String,
    pub min_spacing_minutes: i64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            supabase_service_role_key: "test-service-key".to_string(),
            min_spacing_minutes: 30,
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_service_role_key: self.supabase_service_role_key.clone(),
            min_spacing_minutes: self.min_spacing_minutes,
            ..AppConfig::default()
        }
    }
}

/// 2024-01-08 08:00 UTC, a Monday. Fixtures schedule against this instant.
pub fn reference_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 8, 8, 0, 0).unwrap()
}

pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).unwrap()
}

pub struct TestDoctor;

impl TestDoctor {
    pub fn new(last_name: &str, specialty: &str) -> Doctor {
        Doctor {
            id: Uuid::new_v4(),
            first_name: "Anna".to_string(),
            last_name: last_name.to_string(),
            middle_name: None,
            specialty: specialty.to_string(),
            license_number: format!("LIC-{}", &Uuid::new_v4().simple().to_string()[..8]),
            phone: None,
            email: Some(format!("{}@clinic.test", last_name.to_lowercase())),
            schedule: Some("Mon-Fri 09:00-17:00".to_string()),
            hire_date: NaiveDate::from_ymd_opt(2020, 3, 1),
        }
    }

    pub fn general_practitioner() -> Doctor {
        Self::new("House", "General Practice")
    }
}

pub struct TestPatient;

impl TestPatient {
    pub fn new(last_name: &str) -> Patient {
        Patient {
            id: Uuid::new_v4(),
            first_name: "Ivan".to_string(),
            last_name: last_name.to_string(),
            middle_name: None,
            birth_date: NaiveDate::from_ymd_opt(1985, 6, 15),
            phone: Some("+100000000".to_string()),
            email: None,
            address: Some("1 Main Street".to_string()),
            insurance_policy: format!("POL-{}", &Uuid::new_v4().simple().to_string()[..8]),
        }
    }
}

/// In-memory store pre-populated with doctors and patients, plus a clock pinned to
/// [`reference_now`].
pub struct TestClinic {
    pub repository: Arc<InMemoryRepository>,
    pub clock: FixedClock,
    pub doctors: Vec<Doctor>,
    pub patients: Vec<Patient>,
}

impl TestClinic {
    pub async fn new(doctor_count: usize, patient_count: usize) -> Self {
        let repository = Arc::new(InMemoryRepository::new(TestConfig::default().min_spacing_minutes));
        let mut doctors = Vec::with_capacity(doctor_count);
        let mut patients = Vec::with_capacity(patient_count);

        for i in 0..doctor_count {
            let doctor = TestDoctor::new(&format!("Doctor{}", i + 1), "General Practice");
            doctors.push(repository.save_doctor(doctor).await.expect("seed doctor"));
        }
        for i in 0..patient_count {
            let patient = TestPatient::new(&format!("Patient{}", i + 1));
            patients.push(repository.save_patient(patient).await.expect("seed patient"));
        }

        Self {
            repository,
            clock: FixedClock::new(reference_now()),
            doctors,
            patients,
        }
    }

    pub fn doctor_id(&self, index: usize) -> Uuid {
        self.doctors[index].id
    }

    pub fn patient_id(&self, index: usize) -> Uuid {
        self.patients[index].id
    }
}

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn doctor_response(doctor_id: &str, last_name: &str, specialty: &str) -> serde_json::Value {
        json!({
            "id": doctor_id,
            "first_name": "Anna",
            "last_name": last_name,
            "middle_name": null,
            "specialty": specialty,
            "license_number": "MD123456",
            "phone": null,
            "email": "doctor@example.com",
            "schedule": "Mon-Fri 09:00-17:00",
            "hire_date": "2020-03-01"
        })
    }

    pub fn patient_response(patient_id: &str, last_name: &str) -> serde_json::Value {
        json!({
            "id": patient_id,
            "first_name": "Ivan",
            "last_name": last_name,
            "middle_name": null,
            "birth_date": "1985-06-15",
            "phone": null,
            "email": "patient@example.com",
            "address": "1 Main Street",
            "insurance_policy": "POL-0001"
        })
    }

    pub fn appointment_response(patient_id: &str, doctor_id: &str, status: &str) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "scheduled_at": "2024-01-10T10:00:00Z",
            "reason": "Recurring lower back pain",
            "status": status,
            "appointment_type": "primary",
            "cost": 0.0,
            "notes": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": null
        })
    }
}
