use std::collections::VecDeque;
use std::future::Future;
use std::num::NonZeroU32;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};

// ============================================================================
// Admission Limiter
// ============================================================================

/// Admits at most `max_per_window` operations in any `window`-long interval.
///
/// One limiter is shared by every concurrent lookup and download of a run. It only
/// meters admissions: once an operation is admitted it runs unrestricted, and its
/// slot comes back `window` after the admission whether the operation succeeded,
/// failed, or is still running.
pub struct AdmissionLimiter {
    max_per_window: usize,
    window: Duration,
    // Admission instants still inside the current window, oldest first.
    admitted: Mutex<VecDeque<Instant>>,
}

impl AdmissionLimiter {
    pub fn new(max_per_window: NonZeroU32, window: Duration) -> Self {
        let max_per_window = max_per_window.get() as usize;
        log::debug!(
            "Rate limiter configured: {} operations per {}",
            max_per_window,
            humantime::format_duration(window)
        );

        Self {
            max_per_window,
            window,
            admitted: Mutex::new(VecDeque::with_capacity(max_per_window)),
        }
    }

    /// Wait until the operation may start. Returns the instant it was admitted at.
    pub async fn acquire(&self) -> Instant {
        loop {
            let wait = {
                let mut admitted = self.admitted.lock().await;
                let now = Instant::now();

                while admitted
                    .front()
                    .is_some_and(|at| now.duration_since(*at) >= self.window)
                {
                    admitted.pop_front();
                }

                if admitted.len() < self.max_per_window {
                    admitted.push_back(now);
                    return now;
                }

                // Full window: the oldest admission is the next one to expire.
                let oldest = admitted.front().copied().unwrap_or(now);
                (oldest + self.window).saturating_duration_since(now)
            };

            log::debug!(
                "Rate limit reached ({} per {}), waiting {}",
                self.max_per_window,
                humantime::format_duration(self.window),
                humantime::format_duration(wait)
            );
            sleep(wait).await;
        }
    }

    /// Run `operation` once admitted.
    pub async fn gated<F>(&self, operation: F) -> F::Output
    where
        F: Future,
    {
        self.acquire().await;
        operation.await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use futures::future::join_all;

    fn limiter(max: u32, window: Duration) -> AdmissionLimiter {
        AdmissionLimiter::new(NonZeroU32::new(max).unwrap(), window)
    }

    fn max_admissions_in_any_window(admissions: &[Instant], window: Duration) -> usize {
        admissions
            .iter()
            .map(|start| {
                admissions
                    .iter()
                    .filter(|at| **at >= *start && at.duration_since(*start) < window)
                    .count()
            })
            .max()
            .unwrap_or(0)
    }

    // The paused clock advances to timer deadlines, which are rounded to whole milliseconds.
    fn assert_elapsed(at: Instant, start: Instant, expected: Duration) {
        let elapsed = at.duration_since(start);
        assert!(
            elapsed >= expected && elapsed < expected + Duration::from_millis(5),
            "expected ~{:?}, got {:?}",
            expected,
            elapsed
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_admissions_never_exceed_window_quota() {
        let window = Duration::from_secs(1);
        let limiter = limiter(5, window);

        let admissions = join_all((0..23).map(|_| limiter.acquire())).await;

        assert_eq!(admissions.len(), 23);
        assert!(max_admissions_in_any_window(&admissions, window) <= 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_up_to_quota_is_admitted_immediately() {
        let limiter = limiter(20, Duration::from_secs(1));
        let start = Instant::now();

        let admissions = join_all((0..20).map(|_| limiter.acquire())).await;

        assert!(admissions.iter().all(|at| *at == start));
    }

    #[tokio::test(start_paused = true)]
    async fn test_over_quota_admission_waits_for_oldest_to_expire() {
        let window = Duration::from_millis(500);
        let limiter = limiter(2, window);
        let start = Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;
        let third = limiter.acquire().await;

        assert_elapsed(third, start, window);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slots_expire_independently() {
        let window = Duration::from_secs(1);
        let limiter = limiter(2, window);
        let start = Instant::now();

        limiter.acquire().await;
        tokio::time::sleep(Duration::from_millis(400)).await;
        limiter.acquire().await;

        // First slot frees at 1.0s, second at 1.4s.
        let third = limiter.acquire().await;
        let fourth = limiter.acquire().await;

        assert_elapsed(third, start, Duration::from_millis(1000));
        assert_elapsed(fourth, start, Duration::from_millis(1400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gated_runs_operation_after_admission() {
        let limiter = limiter(1, Duration::from_secs(1));
        let start = Instant::now();

        let first = limiter.gated(async { Instant::now() }).await;
        let second = limiter.gated(async { Instant::now() }).await;

        assert_eq!(first, start);
        assert_elapsed(second, start, Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_operation_still_consumes_its_slot() {
        let window = Duration::from_secs(1);
        let limiter = limiter(1, window);
        let start = Instant::now();

        let failed: Result<(), &str> = limiter.gated(async { Err("boom") }).await;
        assert!(failed.is_err());

        let next = limiter.acquire().await;
        assert_elapsed(next, start, window);
    }
}
