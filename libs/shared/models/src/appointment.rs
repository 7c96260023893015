use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub reason: String,
    pub status: AppointmentStatus,
    pub appointment_type: AppointmentType,
    /// Final cost; only counted as income once the appointment is completed.
    pub cost: f64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Appointment {
    /// Whether this appointment still occupies its doctor's time.
    pub fn is_active(&self) -> bool {
        self.status != AppointmentStatus::Cancelled
    }

    /// Cost counted towards income reports.
    pub fn billable_cost(&self) -> f64 {
        if self.status == AppointmentStatus::Completed {
            self.cost
        } else {
            0.0
        }
    }
}

/// An appointment that has not been stored yet; the repository assigns its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAppointment {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub reason: String,
    pub status: AppointmentStatus,
    pub appointment_type: AppointmentType,
    pub cost: f64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewAppointment {
    pub fn with_id(self, id: Uuid) -> Appointment {
        Appointment {
            id,
            patient_id: self.patient_id,
            doctor_id: self.doctor_id,
            scheduled_at: self.scheduled_at,
            reason: self.reason,
            status: self.status,
            appointment_type: self.appointment_type,
            cost: self.cost,
            notes: self.notes,
            created_at: self.created_at,
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown appointment status '{0}'; expected scheduled, completed or cancelled")]
pub struct ParseStatusError(pub String);

impl FromStr for AppointmentStatus {
    type Err = ParseStatusError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "scheduled" => Ok(AppointmentStatus::Scheduled),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            _ => Err(ParseStatusError(value.to_string())),
        }
    }
}

/// Kind of visit; the category dimension of income reports.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentType {
    #[default]
    Primary,
    FollowUp,
    Consultation,
}

impl fmt::Display for AppointmentType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppointmentType::Primary => write!(f, "Primary"),
            AppointmentType::FollowUp => write!(f, "Follow-up"),
            AppointmentType::Consultation => write!(f, "Consultation"),
        }
    }
}
