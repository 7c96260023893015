// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use shared_config::AppConfig;
use shared_database::ClinicRepository;
use shared_utils::clock::Clock;

use crate::handlers;
use crate::services::{ClinicDirectoryService, SchedulingService};

pub struct AppointmentState {
    pub scheduling: Arc<SchedulingService>,
    pub directory: Arc<ClinicDirectoryService>,
}

impl AppointmentState {
    pub fn new(
        config: &AppConfig,
        repository: Arc<dyn ClinicRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            scheduling: Arc::new(SchedulingService::new(
                repository.clone(),
                clock,
                config.min_spacing_minutes,
            )),
            directory: Arc::new(ClinicDirectoryService::new(repository)),
        }
    }
}

pub fn appointment_routes(state: Arc<AppointmentState>) -> Router {
    Router::new()
        .route("/", post(handlers::book_appointment))
        .route("/conflicts/check", get(handlers::check_appointment_conflicts))
        .route("/doctors/{doctor_id}", get(handlers::get_doctor_appointments))
        .route("/patients/{patient_id}", get(handlers::get_patient_appointments))
        .route(
            "/{appointment_id}",
            get(handlers::get_appointment)
                .put(handlers::update_appointment)
                .delete(handlers::delete_appointment),
        )
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .route("/{appointment_id}/complete", post(handlers::complete_appointment))
        .with_state(state)
}

pub fn directory_routes(state: Arc<AppointmentState>) -> Router {
    Router::new()
        .route("/doctors", get(handlers::list_doctors).post(handlers::register_doctor))
        .route(
            "/doctors/{doctor_id}",
            get(handlers::get_doctor).delete(handlers::delete_doctor),
        )
        .route("/patients", get(handlers::list_patients).post(handlers::register_patient))
        .route(
            "/patients/{patient_id}",
            get(handlers::get_patient).delete(handlers::delete_patient),
        )
        .with_state(state)
}
