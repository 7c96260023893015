// libs/report-cell/src/router.rs
use std::sync::Arc;

use axum::{routing::get, Router};

use shared_database::ClinicRepository;
use shared_utils::clock::Clock;

use crate::handlers;
use crate::services::ReportAggregator;

pub struct ReportState {
    pub aggregator: ReportAggregator,
}

impl ReportState {
    pub fn new(repository: Arc<dyn ClinicRepository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            aggregator: ReportAggregator::new(repository, clock),
        }
    }
}

pub fn report_routes(state: Arc<ReportState>) -> Router {
    Router::new()
        .route("/appointments", get(handlers::appointment_report))
        .route("/income-by-category", get(handlers::income_by_category_report))
        .with_state(state)
}
