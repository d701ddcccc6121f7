//! Per-URL wall-clock deadline supervisor.
//!
//! One deadline bounds one URL's whole detection (authentication through
//! token scoring). Arming yields an RAII guard; the disarm is the guard's
//! `Drop`, so it runs on every exit path, including early returns and panic
//! unwinds. Deadlines do not nest: arming while armed is a programming
//! error, surfaced as [`DeadlineError::AlreadyArmed`].

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, trace};

/// The armed deadline expired before the bounded operation finished.
#[derive(Debug, Error)]
#[error("per-url deadline of {limit:?} exceeded")]
pub struct CancellationError {
    /// The wall-clock limit that was exceeded.
    pub limit: Duration,
}

/// Supervisor misuse errors.
#[derive(Debug, Error)]
pub enum DeadlineError {
    /// A deadline was armed while another was still active.
    #[error("a deadline is already armed; deadlines do not nest")]
    AlreadyArmed,
}

/// Owns the single armed-deadline slot for the batch.
#[derive(Debug, Default)]
pub struct DeadlineSupervisor {
    armed: Arc<AtomicBool>,
}

impl DeadlineSupervisor {
    /// Creates a supervisor with no deadline armed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the deadline for one URL's processing.
    ///
    /// A `None` limit (configured timeout of 0) arms an unbounded deadline:
    /// the guard still occupies the slot so overlap stays detectable, but
    /// the bounded future never expires.
    ///
    /// # Errors
    ///
    /// Returns [`DeadlineError::AlreadyArmed`] when a previous guard is
    /// still alive. This is a bug in the caller, not a runtime condition.
    pub fn arm(&self, limit: Option<Duration>) -> Result<DeadlineGuard, DeadlineError> {
        if self.armed.swap(true, Ordering::SeqCst) {
            return Err(DeadlineError::AlreadyArmed);
        }

        debug!(?limit, "deadline armed");
        Ok(DeadlineGuard {
            armed: Arc::clone(&self.armed),
            limit,
        })
    }

    /// Reports whether a deadline is currently armed.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }
}

/// RAII handle over one armed deadline.
#[derive(Debug)]
pub struct DeadlineGuard {
    armed: Arc<AtomicBool>,
    limit: Option<Duration>,
}

impl DeadlineGuard {
    /// Runs `operation` under the armed deadline.
    ///
    /// # Errors
    ///
    /// Returns [`CancellationError`] when the limit elapses first; the
    /// in-flight operation is dropped at whichever suspension point it was
    /// parked on.
    pub async fn bound<T>(
        &self,
        operation: impl Future<Output = T>,
    ) -> Result<T, CancellationError> {
        match self.limit {
            None => Ok(operation.await),
            Some(limit) => tokio::time::timeout(limit, operation)
                .await
                .map_err(|_| CancellationError { limit }),
        }
    }
}

impl Drop for DeadlineGuard {
    fn drop(&mut self) {
        self.armed.store(false, Ordering::SeqCst);
        trace!("deadline disarmed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deadline_allows_fast_operation() {
        let supervisor = DeadlineSupervisor::new();
        let guard = supervisor.arm(Some(Duration::from_secs(5))).unwrap();

        let result = guard.bound(async { 42 }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_deadline_cancels_hung_operation() {
        let supervisor = DeadlineSupervisor::new();
        let guard = supervisor.arm(Some(Duration::from_millis(20))).unwrap();

        let result = guard
            .bound(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
            })
            .await;
        assert!(result.is_err(), "hung operation must be cancelled");
    }

    #[tokio::test]
    async fn test_unbounded_deadline_never_expires() {
        let supervisor = DeadlineSupervisor::new();
        let guard = supervisor.arm(None).unwrap();

        let result = guard
            .bound(async {
                tokio::time::sleep(Duration::from_millis(30)).await;
                "done"
            })
            .await;
        assert_eq!(result.unwrap(), "done");
    }

    #[tokio::test]
    async fn test_disarm_runs_on_drop() {
        let supervisor = DeadlineSupervisor::new();
        {
            let _guard = supervisor.arm(Some(Duration::from_secs(5))).unwrap();
            assert!(supervisor.is_armed());
        }
        assert!(!supervisor.is_armed(), "guard drop must disarm");
    }

    #[tokio::test]
    async fn test_disarm_runs_when_bounded_operation_errors() {
        let supervisor = DeadlineSupervisor::new();
        {
            let guard = supervisor.arm(Some(Duration::from_secs(5))).unwrap();
            let result: Result<Result<(), &str>, CancellationError> =
                guard.bound(async { Err("authentication blew up") }).await;
            assert!(result.unwrap().is_err());
        }
        assert!(
            !supervisor.is_armed(),
            "disarm must run even when the bounded step fails"
        );
    }

    #[tokio::test]
    async fn test_overlapping_arm_is_rejected() {
        let supervisor = DeadlineSupervisor::new();
        let _guard = supervisor.arm(Some(Duration::from_secs(5))).unwrap();

        let second = supervisor.arm(Some(Duration::from_secs(5)));
        assert!(matches!(second, Err(DeadlineError::AlreadyArmed)));
    }

    #[tokio::test]
    async fn test_rearm_after_disarm_succeeds() {
        let supervisor = DeadlineSupervisor::new();
        drop(supervisor.arm(None).unwrap());
        assert!(supervisor.arm(None).is_ok());
    }

    #[tokio::test]
    async fn test_cancellation_reports_the_limit() {
        let supervisor = DeadlineSupervisor::new();
        let guard = supervisor.arm(Some(Duration::from_millis(10))).unwrap();

        let error = guard
            .bound(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
            })
            .await
            .unwrap_err();
        assert_eq!(error.limit, Duration::from_millis(10));
        assert!(error.to_string().contains("deadline"));
    }
}
