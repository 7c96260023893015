use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::{Appointment, AppointmentStatus, Doctor, NewAppointment, Patient};

use crate::repository::{ClinicRepository, RepositoryError, RepositoryResult};

/// Postgres SQLSTATE for `exclusion_violation`.
const EXCLUSION_VIOLATION: &str = "23P01";

#[derive(Error, Debug)]
pub enum SupabaseError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api {
        status: StatusCode,
        code: Option<String>,
        message: String,
    },
}

impl SupabaseError {
    fn is_exclusion_violation(&self) -> bool {
        matches!(self, SupabaseError::Api { status, code: Some(code), .. }
            if *status == StatusCode::CONFLICT && code == EXCLUSION_VIOLATION)
    }
}

impl From<SupabaseError> for RepositoryError {
    fn from(err: SupabaseError) -> Self {
        RepositoryError::Storage(err.to_string())
    }
}

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
    service_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
            service_key: config.supabase_service_role_key.clone(),
        }
    }

    fn get_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Ok(value) = HeaderValue::from_str(&self.anon_key) {
            headers.insert("apikey", value);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", self.service_key)) {
            headers.insert(AUTHORIZATION, value);
        }

        headers
    }

    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T, SupabaseError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making request to {}", url);

        let mut headers = self.get_headers();
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url).headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);

            let code = serde_json::from_str::<Value>(&error_text)
                .ok()
                .and_then(|body| body.get("code").and_then(Value::as_str).map(str::to_string));

            return Err(SupabaseError::Api {
                status,
                code,
                message: error_text,
            });
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }
}

fn timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// PostgREST-backed store.
///
/// The `appointments` table is expected to carry the spacing rule as an exclusion
/// constraint, e.g. `EXCLUDE USING gist (doctor_id WITH =, tstzrange(scheduled_at - interval
/// '15 min', scheduled_at + interval '15 min') WITH &&) WHERE (status <> 'cancelled')`
/// for a 30 minute spacing.
pub struct SupabaseRepository {
    supabase: SupabaseClient,
}

impl SupabaseRepository {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    async fn fetch_appointments(&self, query: &str) -> RepositoryResult<Vec<Appointment>> {
        let path = format!("/rest/v1/appointments?{}&order=scheduled_at.asc,id.asc", query);
        let result: Vec<Value> = self.supabase.request(Method::GET, &path, None, None).await?;

        let appointments = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Appointment>, _>>()?;

        Ok(appointments)
    }

    async fn fetch_one<T: DeserializeOwned>(&self, table: &str, id: Uuid) -> RepositoryResult<Option<T>> {
        let path = format!("/rest/v1/{}?id=eq.{}", table, id);
        let mut result: Vec<Value> = self.supabase.request(Method::GET, &path, None, None).await?;

        match result.pop() {
            Some(row) => Ok(Some(serde_json::from_value(row)?)),
            None => Ok(None),
        }
    }

    async fn fetch_all<T: DeserializeOwned>(&self, table: &str) -> RepositoryResult<Vec<T>> {
        let path = format!("/rest/v1/{}?order=last_name.asc,first_name.asc,id.asc", table);
        let result: Vec<Value> = self.supabase.request(Method::GET, &path, None, None).await?;

        result
            .into_iter()
            .map(|row| serde_json::from_value(row).map_err(RepositoryError::from))
            .collect()
    }

    async fn delete_one(&self, table: &str, id: Uuid) -> RepositoryResult<bool> {
        let path = format!("/rest/v1/{}?id=eq.{}", table, id);
        let result: Vec<Value> = self.supabase.request(Method::DELETE, &path, None, None).await?;
        Ok(!result.is_empty())
    }

    async fn upsert<T>(&self, table: &str, record: &T) -> RepositoryResult<T>
    where
        T: serde::Serialize + DeserializeOwned,
    {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Prefer",
            HeaderValue::from_static("resolution=merge-duplicates,return=representation"),
        );

        let path = format!("/rest/v1/{}", table);
        let mut result: Vec<Value> = self
            .supabase
            .request(Method::POST, &path, Some(serde_json::to_value(record)?), Some(headers))
            .await?;

        let row = result
            .pop()
            .ok_or_else(|| RepositoryError::Storage(format!("Upsert into {} returned no rows", table)))?;
        Ok(serde_json::from_value(row)?)
    }

    fn map_write_error(err: SupabaseError, doctor_id: Uuid) -> RepositoryError {
        if err.is_exclusion_violation() {
            RepositoryError::ExclusionViolation {
                doctor_id,
                conflicting_id: None,
            }
        } else {
            err.into()
        }
    }
}

#[async_trait]
impl ClinicRepository for SupabaseRepository {
    async fn find_appointment(&self, id: Uuid) -> RepositoryResult<Option<Appointment>> {
        self.fetch_one("appointments", id).await
    }

    async fn find_appointments_by_doctor(
        &self,
        doctor_id: Uuid,
        status: Option<AppointmentStatus>,
    ) -> RepositoryResult<Vec<Appointment>> {
        let mut query = format!("doctor_id=eq.{}", doctor_id);
        if let Some(status) = status {
            query.push_str(&format!("&status=eq.{}", status));
        }
        self.fetch_appointments(&query).await
    }

    async fn find_appointments_by_patient(&self, patient_id: Uuid) -> RepositoryResult<Vec<Appointment>> {
        self.fetch_appointments(&format!("patient_id=eq.{}", patient_id)).await
    }

    async fn find_appointments_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> RepositoryResult<Vec<Appointment>> {
        let query = format!(
            "scheduled_at=gte.{}&scheduled_at=lte.{}",
            timestamp(from),
            timestamp(to)
        );
        self.fetch_appointments(&query).await
    }

    async fn find_doctor(&self, id: Uuid) -> RepositoryResult<Option<Doctor>> {
        self.fetch_one("doctors", id).await
    }

    async fn find_patient(&self, id: Uuid) -> RepositoryResult<Option<Patient>> {
        self.fetch_one("patients", id).await
    }

    async fn list_doctors(&self) -> RepositoryResult<Vec<Doctor>> {
        self.fetch_all("doctors").await
    }

    async fn list_patients(&self) -> RepositoryResult<Vec<Patient>> {
        self.fetch_all("patients").await
    }

    async fn insert_appointment(&self, appointment: NewAppointment) -> RepositoryResult<Appointment> {
        let doctor_id = appointment.doctor_id;
        let body = serde_json::to_value(&appointment)?;

        let mut result: Vec<Value> = self
            .supabase
            .request(Method::POST, "/rest/v1/appointments", Some(body), None)
            .await
            .map_err(|e| Self::map_write_error(e, doctor_id))?;

        let row = result
            .pop()
            .ok_or_else(|| RepositoryError::Storage("Insert returned no rows".to_string()))?;
        Ok(serde_json::from_value(row)?)
    }

    async fn update_appointment(&self, appointment: Appointment) -> RepositoryResult<Appointment> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment.id);
        let body = serde_json::to_value(&appointment)?;

        let mut result: Vec<Value> = self
            .supabase
            .request(Method::PATCH, &path, Some(body), None)
            .await
            .map_err(|e| Self::map_write_error(e, appointment.doctor_id))?;

        match result.pop() {
            Some(row) => Ok(serde_json::from_value(row)?),
            None => Err(RepositoryError::NotFound(appointment.id)),
        }
    }

    async fn delete_appointment(&self, id: Uuid) -> RepositoryResult<bool> {
        self.delete_one("appointments", id).await
    }

    async fn save_doctor(&self, doctor: Doctor) -> RepositoryResult<Doctor> {
        self.upsert("doctors", &doctor).await
    }

    async fn save_patient(&self, patient: Patient) -> RepositoryResult<Patient> {
        self.upsert("patients", &patient).await
    }

    async fn delete_doctor(&self, id: Uuid) -> RepositoryResult<bool> {
        self.delete_one("doctors", id).await
    }

    async fn delete_patient(&self, id: Uuid) -> RepositoryResult<bool> {
        self.delete_one("patients", id).await
    }
}
