// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-flight guard for long-running jobs, with an observable status.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use ferry_core::{FerryError, RunStatus};
use tokio::sync::watch;

#[derive(Debug)]
struct LockInner {
    job: &'static str,
    busy: AtomicBool,
    status: watch::Sender<RunStatus>,
}

/// Allows at most one job of a kind at a time.
#[derive(Debug, Clone)]
pub struct RunLock {
    inner: Arc<LockInner>,
}

impl RunLock {
    pub fn new(job: &'static str) -> Self {
        let (status, _) = watch::channel(RunStatus::Idle);
        Self {
            inner: Arc::new(LockInner {
                job,
                busy: AtomicBool::new(false),
                status,
            }),
        }
    }

    /// Claim the lock. Fails with [`FerryError::Busy`] if a job holds it.
    pub fn try_acquire(&self) -> Result<RunGuard, FerryError> {
        self.inner
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| FerryError::Busy {
                job: self.inner.job,
            })?;
        self.inner.status.send_replace(RunStatus::Running);
        Ok(RunGuard {
            inner: Arc::clone(&self.inner),
        })
    }

    pub fn is_running(&self) -> bool {
        self.inner.busy.load(Ordering::Acquire)
    }

    pub fn status(&self) -> RunStatus {
        *self.inner.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<RunStatus> {
        self.inner.status.subscribe()
    }
}

/// Held for the lifetime of a job; dropping it releases the lock.
#[derive(Debug)]
pub struct RunGuard {
    inner: Arc<LockInner>,
}

impl RunGuard {
    pub fn set_status(&self, status: RunStatus) {
        self.inner.status.send_replace(status);
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.inner.status.send_replace(RunStatus::Idle);
        self.inner.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_is_busy() {
        let lock = RunLock::new("clone");
        let guard = lock.try_acquire().unwrap();
        assert!(lock.is_running());
        assert_eq!(lock.status(), RunStatus::Running);

        match lock.try_acquire() {
            Err(FerryError::Busy { job }) => assert_eq!(job, "clone"),
            other => panic!("expected Busy, got {other:?}"),
        }

        drop(guard);
        assert!(!lock.is_running());
        assert_eq!(lock.status(), RunStatus::Idle);
        assert!(lock.try_acquire().is_ok());
    }

    #[test]
    fn status_changes_are_observable() {
        let lock = RunLock::new("clone");
        let rx = lock.subscribe();
        let guard = lock.try_acquire().unwrap();
        guard.set_status(RunStatus::CoolingDown);
        assert_eq!(*rx.borrow(), RunStatus::CoolingDown);
        drop(guard);
        assert_eq!(*rx.borrow(), RunStatus::Idle);
    }
}
