pub mod conflict;
pub mod directory;
pub mod lifecycle;
pub mod locks;
pub mod scheduling;

pub use conflict::ConflictValidator;
pub use directory::ClinicDirectoryService;
pub use lifecycle::AppointmentLifecycle;
pub use scheduling::SchedulingService;
