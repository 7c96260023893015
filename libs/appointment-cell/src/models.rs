// libs/appointment-cell/src/models.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use std::fmt;

use shared_database::RepositoryError;
use shared_models::error::AppError;
use shared_models::{AppointmentStatus, AppointmentType};

pub const MIN_REASON_LENGTH: usize = 10;
pub const MAX_REASON_LENGTH: usize = 500;

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

/// Caller input for a new appointment. Required fields are optional here so that
/// a missing field is reported as a validation error rather than a decode failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentDraft {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub reason: Option<String>,
    #[serde(default)]
    pub appointment_type: Option<AppointmentType>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Replacement values for an existing appointment's editable fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentChanges {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub reason: Option<String>,
    #[serde(default)]
    pub appointment_type: Option<AppointmentType>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl From<AppointmentChanges> for AppointmentDraft {
    fn from(changes: AppointmentChanges) -> Self {
        Self {
            patient_id: changes.patient_id,
            doctor_id: changes.doctor_id,
            scheduled_at: changes.scheduled_at,
            reason: changes.reason,
            appointment_type: changes.appointment_type,
            notes: changes.notes,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteAppointmentRequest {
    pub final_cost: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictCheckQuery {
    pub doctor_id: Uuid,
    pub candidate_time: DateTime<Utc>,
    pub exclude_appointment_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DoctorAppointmentsQuery {
    pub status: Option<String>,
}

/// Draft fields after validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedFields {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub reason: String,
    pub appointment_type: AppointmentType,
    pub notes: Option<String>,
}

impl AppointmentDraft {
    /// Checks presence and shape of every field. Time-dependent rules are applied by the
    /// scheduling service.
    pub fn validate(self) -> Result<ValidatedFields, SchedulingError> {
        let mut missing = Vec::new();

        let patient_id = self.patient_id.filter(|id| !id.is_nil());
        let doctor_id = self.doctor_id.filter(|id| !id.is_nil());
        let reason = self.reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());

        if patient_id.is_none() {
            missing.push("patient_id");
        }
        if doctor_id.is_none() {
            missing.push("doctor_id");
        }
        if self.scheduled_at.is_none() {
            missing.push("scheduled_at");
        }
        if reason.is_none() {
            missing.push("reason");
        }

        let (Some(patient_id), Some(doctor_id), Some(scheduled_at), Some(reason)) =
            (patient_id, doctor_id, self.scheduled_at, reason)
        else {
            return Err(SchedulingError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        };

        let reason_length = reason.chars().count();
        if !(MIN_REASON_LENGTH..=MAX_REASON_LENGTH).contains(&reason_length) {
            return Err(SchedulingError::Validation(format!(
                "Reason must be between {} and {} characters, got {}",
                MIN_REASON_LENGTH, MAX_REASON_LENGTH, reason_length
            )));
        }

        Ok(ValidatedFields {
            patient_id,
            doctor_id,
            scheduled_at,
            reason,
            appointment_type: self.appointment_type.unwrap_or_default(),
            notes: self.notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
        })
    }
}

// ==============================================================================
// RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", content = "appointment_id", rename_all = "snake_case")]
pub enum ConflictCheck {
    NoConflict,
    ConflictWith(Uuid),
}

impl ConflictCheck {
    pub fn has_conflict(&self) -> bool {
        matches!(self, ConflictCheck::ConflictWith(_))
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Doctor,
    Patient,
    Appointment,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EntityKind::Doctor => write!(f, "Doctor"),
            EntityKind::Patient => write!(f, "Patient"),
            EntityKind::Appointment => write!(f, "Appointment"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchedulingError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: Uuid },

    #[error("Appointment conflicts with existing booking {conflicting_id}")]
    SchedulingConflict { conflicting_id: Uuid },

    #[error("Appointment cannot be modified in current status: {current}")]
    InvalidTransition { current: AppointmentStatus },

    #[error("{entity} {id} still has appointments")]
    HasAppointments { entity: EntityKind, id: Uuid },

    #[error("Storage failure: {0}")]
    Infrastructure(String),
}

impl SchedulingError {
    pub fn not_found(entity: EntityKind, id: Uuid) -> Self {
        SchedulingError::NotFound { entity, id }
    }

    /// Only infrastructure failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SchedulingError::Infrastructure(_))
    }
}

impl From<RepositoryError> for SchedulingError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::ExclusionViolation { conflicting_id: Some(conflicting_id), .. } => {
                SchedulingError::SchedulingConflict { conflicting_id }
            }
            RepositoryError::NotFound(id) => SchedulingError::not_found(EntityKind::Appointment, id),
            other => SchedulingError::Infrastructure(other.to_string()),
        }
    }
}

impl From<SchedulingError> for AppError {
    fn from(err: SchedulingError) -> Self {
        match err {
            SchedulingError::Validation(msg) => AppError::ValidationError(msg),
            SchedulingError::NotFound { .. } => AppError::NotFound(err.to_string()),
            SchedulingError::SchedulingConflict { .. }
            | SchedulingError::InvalidTransition { .. }
            | SchedulingError::HasAppointments { .. } => AppError::Conflict(err.to_string()),
            SchedulingError::Infrastructure(msg) => AppError::Database(msg),
        }
    }
}

/// Parses a textual status; anything outside the three known values is rejected.
pub fn parse_status(value: &str) -> Result<AppointmentStatus, SchedulingError> {
    value
        .parse::<AppointmentStatus>()
        .map_err(|e| SchedulingError::Validation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::TimeZone;

    fn complete_draft() -> AppointmentDraft {
        AppointmentDraft {
            patient_id: Some(Uuid::new_v4()),
            doctor_id: Some(Uuid::new_v4()),
            scheduled_at: Some(Utc.with_ymd_and_hms(2024, 1, 10, 10, 0, 0).unwrap()),
            reason: Some("  Follow-up on blood pressure  ".to_string()),
            appointment_type: None,
            notes: Some("   ".to_string()),
        }
    }

    #[test]
    fn test_validate_trims_and_defaults() {
        let fields = complete_draft().validate().unwrap();
        assert_eq!(fields.reason, "Follow-up on blood pressure");
        assert_eq!(fields.appointment_type, AppointmentType::Primary);
        assert_eq!(fields.notes, None);
    }

    #[test]
    fn test_validate_lists_missing_fields() {
        let draft = AppointmentDraft {
            doctor_id: Some(Uuid::nil()),
            ..complete_draft()
        };
        let draft = AppointmentDraft { reason: None, ..draft };

        assert_matches!(
            draft.validate(),
            Err(SchedulingError::Validation(msg)) if msg == "Missing required fields: doctor_id, reason"
        );
    }

    #[test]
    fn test_reason_length_bounds() {
        let short = AppointmentDraft { reason: Some("Headache".to_string()), ..complete_draft() };
        assert_matches!(short.validate(), Err(SchedulingError::Validation(_)));

        let exact_min = AppointmentDraft { reason: Some("a".repeat(10)), ..complete_draft() };
        assert!(exact_min.validate().is_ok());

        let exact_max = AppointmentDraft { reason: Some("я".repeat(500)), ..complete_draft() };
        assert!(exact_max.validate().is_ok());

        let long = AppointmentDraft { reason: Some("a".repeat(501)), ..complete_draft() };
        assert_matches!(long.validate(), Err(SchedulingError::Validation(_)));
    }

    #[test]
    fn test_parse_status_rejects_unknown_values() {
        assert_eq!(parse_status("Completed"), Ok(AppointmentStatus::Completed));
        assert_matches!(parse_status("no_show"), Err(SchedulingError::Validation(_)));
    }

    #[test]
    fn test_repository_errors_map_to_distinct_kinds() {
        let id = Uuid::new_v4();
        let conflict: SchedulingError = RepositoryError::ExclusionViolation {
            doctor_id: Uuid::new_v4(),
            conflicting_id: Some(id),
        }
        .into();
        assert_eq!(conflict, SchedulingError::SchedulingConflict { conflicting_id: id });

        let storage: SchedulingError = RepositoryError::Storage("connection reset".into()).into();
        assert!(storage.is_retryable());
        assert!(!conflict.is_retryable());
    }

    #[test]
    fn test_scheduling_errors_map_to_http_status() {
        use axum::http::StatusCode;

        let transition: AppError =
            SchedulingError::InvalidTransition { current: AppointmentStatus::Cancelled }.into();
        assert_matches!(&transition, AppError::Conflict(msg) if msg.contains("cancelled"));
        assert_eq!(transition.status_code(), StatusCode::CONFLICT);

        let in_use: AppError = SchedulingError::HasAppointments {
            entity: EntityKind::Doctor,
            id: Uuid::new_v4(),
        }
        .into();
        assert_eq!(in_use.status_code(), StatusCode::CONFLICT);

        let missing: AppError = SchedulingError::not_found(EntityKind::Patient, Uuid::new_v4()).into();
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);

        let invalid: AppError = SchedulingError::Validation("bad".into()).into();
        assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_conflict_check_serialization() {
        let id = Uuid::new_v4();
        let json = serde_json::to_value(ConflictCheck::ConflictWith(id)).unwrap();
        assert_eq!(json["result"], "conflict_with");
        assert_eq!(json["appointment_id"], id.to_string());

        let json = serde_json::to_value(ConflictCheck::NoConflict).unwrap();
        assert_eq!(json["result"], "no_conflict");
    }
}
