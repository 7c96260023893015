// libs/appointment-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use shared_models::{Appointment, AppointmentStatus};

use crate::models::SchedulingError;

/// Status state machine: `Scheduled -> Completed | Cancelled`. Both targets are terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct AppointmentLifecycle;

impl AppointmentLifecycle {
    pub fn new() -> Self {
        Self
    }

    /// Get all valid next statuses for a given current status
    pub fn valid_transitions(&self, current_status: AppointmentStatus) -> &'static [AppointmentStatus] {
        match current_status {
            AppointmentStatus::Scheduled => &[AppointmentStatus::Completed, AppointmentStatus::Cancelled],
            // Terminal states - no transitions allowed
            AppointmentStatus::Completed | AppointmentStatus::Cancelled => &[],
        }
    }

    pub fn is_terminal(&self, status: AppointmentStatus) -> bool {
        self.valid_transitions(status).is_empty()
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), SchedulingError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if !self.valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(SchedulingError::InvalidTransition { current: current_status });
        }

        Ok(())
    }

    pub fn complete(&self, appointment: &mut Appointment) -> Result<(), SchedulingError> {
        self.transition(appointment, AppointmentStatus::Completed)
    }

    pub fn cancel(&self, appointment: &mut Appointment) -> Result<(), SchedulingError> {
        self.transition(appointment, AppointmentStatus::Cancelled)
    }

    fn transition(
        &self,
        appointment: &mut Appointment,
        target: AppointmentStatus,
    ) -> Result<(), SchedulingError> {
        self.validate_status_transition(appointment.status, target)?;
        appointment.status = target;
        Ok(())
    }
}
