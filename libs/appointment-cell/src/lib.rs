pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::*;
pub use router::{appointment_routes, directory_routes, AppointmentState};
pub use services::{AppointmentLifecycle, ClinicDirectoryService, ConflictValidator, SchedulingService};
