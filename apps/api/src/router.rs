use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use appointment_cell::router::{appointment_routes, directory_routes, AppointmentState};
use report_cell::router::{report_routes, ReportState};
use shared_config::AppConfig;
use shared_database::ClinicRepository;
use shared_utils::clock::Clock;

pub fn create_router(
    config: &AppConfig,
    repository: Arc<dyn ClinicRepository>,
    clock: Arc<dyn Clock>,
) -> Router {
    let appointment_state = Arc::new(AppointmentState::new(config, repository.clone(), clock.clone()));
    let report_state = Arc::new(ReportState::new(repository, clock));

    Router::new()
        .route("/", get(|| async { "Clinic scheduling API is running!" }))
        .route("/health", get(health))
        .nest("/appointments", appointment_routes(appointment_state.clone()))
        .nest("/reports", report_routes(report_state))
        .merge(directory_routes(appointment_state))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
