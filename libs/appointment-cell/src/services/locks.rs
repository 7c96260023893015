// libs/appointment-cell/src/services/locks.rs
//
// Per-doctor scheduling locks. Every write that can change a doctor's calendar holds the
// doctor's lock across validate-then-persist, so two concurrent bookings cannot both pass
// the conflict check.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;
use uuid::Uuid;

#[derive(Default)]
pub struct DoctorLocks {
    locks: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

/// Held locks; released on drop.
#[derive(Debug)]
pub struct SchedulingLockGuard {
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl DoctorLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, doctor_id: Uuid) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(doctor_id).or_default().clone()
    }

    /// Acquire the scheduling locks of every listed doctor. Locks are taken in id order
    /// so that two writers touching the same pair of doctors cannot deadlock.
    pub async fn acquire(&self, doctor_ids: &[Uuid]) -> SchedulingLockGuard {
        let mut ids = doctor_ids.to_vec();
        ids.sort();
        ids.dedup();

        let mut guards = Vec::with_capacity(ids.len());
        for doctor_id in ids {
            guards.push(self.lock_for(doctor_id).lock_owned().await);
            debug!("Scheduling lock acquired for doctor {}", doctor_id);
        }

        SchedulingLockGuard { _guards: guards }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio_test::{assert_pending, assert_ready, task};

    #[tokio::test]
    async fn test_same_doctor_is_serialized() {
        let locks = DoctorLocks::new();
        let doctor_id = Uuid::new_v4();

        let ids = [doctor_id];

        let guard = locks.acquire(&ids).await;
        let mut contender = task::spawn(locks.acquire(&ids));
        assert_pending!(contender.poll());

        drop(guard);
        assert!(contender.is_woken());
        let _second = assert_ready!(contender.poll());
    }

    #[tokio::test]
    async fn test_other_doctors_are_independent() {
        let locks = DoctorLocks::new();
        let _first = locks.acquire(&[Uuid::new_v4()]).await;

        let second = tokio::time::timeout(Duration::from_millis(100), locks.acquire(&[Uuid::new_v4()])).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_ids_do_not_self_deadlock() {
        let locks = DoctorLocks::new();
        let doctor_id = Uuid::new_v4();

        let guard = tokio::time::timeout(
            Duration::from_millis(100),
            locks.acquire(&[doctor_id, doctor_id]),
        )
        .await;
        assert!(guard.is_ok());
    }
}
