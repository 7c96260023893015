// libs/report-cell/src/services/aggregator.rs
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use tracing::{debug, error, info};
use uuid::Uuid;

use shared_database::ClinicRepository;
use shared_models::{Appointment, AppointmentStatus, AppointmentType};
use shared_utils::clock::Clock;

use crate::models::{CategoryIncomeRow, ReportError, ReportKind, ReportRow};

/// Read-only aggregation of historical appointments. Never takes scheduling locks, so
/// results may trail concurrent writes.
pub struct ReportAggregator {
    repository: Arc<dyn ClinicRepository>,
    clock: Arc<dyn Clock>,
}

impl ReportAggregator {
    pub fn new(repository: Arc<dyn ClinicRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Appointment counts and completed income per `(bucket, doctor)`, ordered by bucket
    /// and then doctor id. Buckets without appointments are omitted.
    pub async fn generate(
        &self,
        kind: ReportKind,
        period_start: Option<NaiveDate>,
        period_end: Option<NaiveDate>,
    ) -> Result<Vec<ReportRow>, ReportError> {
        let appointments = self.load_period(kind, period_start, period_end).await?;

        let mut groups: BTreeMap<(NaiveDate, Uuid), (u64, f64)> = BTreeMap::new();
        for appointment in &appointments {
            let bucket = kind.bucket_start(appointment.scheduled_at.date_naive());
            let entry = groups.entry((bucket, appointment.doctor_id)).or_default();
            entry.0 += 1;
            entry.1 += appointment.billable_cost();
        }

        let rows: Vec<ReportRow> = groups
            .into_iter()
            .map(|((bucket_start, doctor_id), (appointment_count, total_income))| ReportRow {
                bucket_start,
                doctor_id,
                appointment_count,
                total_income,
            })
            .collect();

        info!("Generated {} report with {} rows from {} appointments",
              kind, rows.len(), appointments.len());
        Ok(rows)
    }

    /// Completed appointments and their income per `(bucket, appointment type)`.
    pub async fn income_by_category(
        &self,
        kind: ReportKind,
        period_start: Option<NaiveDate>,
        period_end: Option<NaiveDate>,
    ) -> Result<Vec<CategoryIncomeRow>, ReportError> {
        let appointments = self.load_period(kind, period_start, period_end).await?;

        let mut groups: BTreeMap<(NaiveDate, AppointmentType), (u64, f64)> = BTreeMap::new();
        for appointment in appointments
            .iter()
            .filter(|apt| apt.status == AppointmentStatus::Completed)
        {
            let bucket = kind.bucket_start(appointment.scheduled_at.date_naive());
            let entry = groups.entry((bucket, appointment.appointment_type)).or_default();
            entry.0 += 1;
            entry.1 += appointment.cost;
        }

        Ok(groups
            .into_iter()
            .map(|((bucket_start, appointment_type), (completed_count, total_income))| {
                CategoryIncomeRow {
                    bucket_start,
                    appointment_type,
                    completed_count,
                    total_income,
                }
            })
            .collect())
    }

    // ==============================================================================
    // PRIVATE HELPER METHODS
    // ==============================================================================

    /// Resolve the period and fetch every appointment scheduled inside it. An inverted
    /// period yields no appointments rather than an error.
    async fn load_period(
        &self,
        kind: ReportKind,
        period_start: Option<NaiveDate>,
        period_end: Option<NaiveDate>,
    ) -> Result<Vec<Appointment>, ReportError> {
        let (default_start, default_end) = kind.default_period(self.clock.today());
        let start = period_start.unwrap_or(default_start);
        let end = period_end.unwrap_or(default_end);

        debug!("Loading {} report period {} to {}", kind, start, end);

        if start > end {
            debug!("Empty report period: {} is after {}", start, end);
            return Ok(Vec::new());
        }

        let (from, to) = period_bounds(start, end);
        self.repository
            .find_appointments_between(from, to)
            .await
            .map_err(|e| {
                error!("Failed to load appointments for report: {}", e);
                ReportError::from(e)
            })
    }
}

/// `[start 00:00, end 23:59:59.999999999]` in UTC.
fn period_bounds(start: NaiveDate, end: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let end_of_day = NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).unwrap_or(NaiveTime::MIN);
    (
        start.and_time(NaiveTime::MIN).and_utc(),
        end.and_time(end_of_day).and_utc(),
    )
}
