// libs/report-cell/src/models.rs
use std::fmt;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::RepositoryError;
use shared_models::error::AppError;
use shared_models::AppointmentType;

// ==============================================================================
// REPORT KINDS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Daily,
    Weekly,
    Monthly,
}

impl ReportKind {
    /// First day of the bucket containing `date`.
    pub fn bucket_start(&self, date: NaiveDate) -> NaiveDate {
        match self {
            ReportKind::Daily => date,
            ReportKind::Weekly => {
                date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
            }
            ReportKind::Monthly => date.with_day(1).unwrap_or(date),
        }
    }

    /// Period used when the caller gives no bounds: today, the current ISO week
    /// (Monday to Sunday) or the current calendar month.
    pub fn default_period(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let start = self.bucket_start(today);
        let end = match self {
            ReportKind::Daily => today,
            ReportKind::Weekly => start + Duration::days(6),
            ReportKind::Monthly => last_day_of_month(start),
        };
        (start, end)
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ReportKind::Daily => write!(f, "daily"),
            ReportKind::Weekly => write!(f, "weekly"),
            ReportKind::Monthly => write!(f, "monthly"),
        }
    }
}

fn last_day_of_month(first: NaiveDate) -> NaiveDate {
    let (year, month) = if first.month() == 12 {
        (first.year() + 1, 1)
    } else {
        (first.year(), first.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|next| next.pred_opt())
        .unwrap_or(first)
}

// ==============================================================================
// REPORT ROWS
// ==============================================================================

/// One `(bucket, doctor)` group. Income only counts completed appointments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub bucket_start: NaiveDate,
    pub doctor_id: Uuid,
    pub appointment_count: u64,
    pub total_income: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryIncomeRow {
    pub bucket_start: NaiveDate,
    pub appointment_type: AppointmentType,
    pub completed_count: u64,
    pub total_income: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportQuery {
    pub kind: ReportKind,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReportError {
    #[error("Storage failure: {0}")]
    Infrastructure(String),
}

impl From<RepositoryError> for ReportError {
    fn from(err: RepositoryError) -> Self {
        ReportError::Infrastructure(err.to_string())
    }
}

impl From<ReportError> for AppError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::Infrastructure(msg) => AppError::Database(msg),
        }
    }
}
