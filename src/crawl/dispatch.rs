// src/crawl/dispatch.rs
// =============================================================================
// Bounds how hard we hit the server.
//
// One pool of slots is shared by every request, whatever its host. A request
// takes a slot, runs, then keeps the slot for the configured delay before
// giving it back. With --parallel 1 --delay 2 that means one request every
// two seconds or slower.
//
// There is no timeout here: a server that never answers keeps its slot until
// the process is stopped.
// =============================================================================

use std::future::Future;
use std::time::Duration;

use tokio::sync::Semaphore;

#[derive(Debug)]
pub struct DispatchLimiter {
    // None = unbounded
    slots: Option<Semaphore>,
    delay: Duration,
}

impl DispatchLimiter {
    /// `parallel` of 0 means no cap on concurrent requests. Values above
    /// `Semaphore::MAX_PERMITS` are clamped to it.
    pub fn new(parallel: usize, delay: Duration) -> Self {
        let slots = (parallel > 0).then(|| Semaphore::new(parallel.min(Semaphore::MAX_PERMITS)));
        Self { slots, delay }
    }

    /// Runs `request` inside a slot and holds the slot for the delay afterwards.
    pub async fn run<F>(&self, request: F) -> F::Output
    where
        F: Future,
    {
        // acquire only fails on a closed semaphore, and we never close it
        let _permit = match &self.slots {
            Some(slots) => slots.acquire().await.ok(),
            None => None,
        };

        let output = request.await;

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    async fn track(active: &AtomicUsize, peak: &AtomicUsize) {
        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        active.fetch_sub(1, Ordering::SeqCst);
    }

    async fn peak_with(parallel: usize, tasks: usize) -> usize {
        let limiter = Arc::new(DispatchLimiter::new(parallel, Duration::ZERO));
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut set = tokio::task::JoinSet::new();
        for _ in 0..tasks {
            let (limiter, active, peak) = (limiter.clone(), active.clone(), peak.clone());
            set.spawn(async move { limiter.run(track(&active, &peak)).await });
        }
        while set.join_next().await.is_some() {}
        peak.load(Ordering::SeqCst)
    }

    #[tokio::test]
    async fn test_parallelism_is_capped() {
        assert!(peak_with(2, 8).await <= 2);
        assert_eq!(peak_with(1, 4).await, 1);
    }

    #[tokio::test]
    async fn test_zero_means_unbounded() {
        assert_eq!(peak_with(0, 6).await, 6);
    }

    #[tokio::test]
    async fn test_delay_spaces_out_requests() {
        let limiter = DispatchLimiter::new(1, Duration::from_millis(100));
        let start = Instant::now();
        for _ in 0..3 {
            limiter.run(async {}).await;
        }
        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_huge_parallel_is_clamped() {
        let limiter = DispatchLimiter::new(usize::MAX, Duration::ZERO);
        assert_eq!(limiter.run(async { "ran" }).await, "ran");
        assert_eq!(peak_with(usize::MAX, 6).await, 6);
    }

    #[tokio::test]
    async fn test_run_returns_output() {
        let limiter = DispatchLimiter::new(3, Duration::ZERO);
        assert_eq!(limiter.run(async { 41 + 1 }).await, 42);
    }
}
