//! Bounded retry ladder for flaky chain reads

use crate::config::RetryConfig;
use rand::{Rng, RngCore};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// One immediate attempt, then one more attempt after each delay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryLadder {
    delays: Vec<Duration>,
    jitter: bool,
}

impl RetryLadder {
    pub fn new(delays: Vec<Duration>, jitter: bool) -> Self {
        Self { delays, jitter }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config
                .delays_ms
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect(),
            config.jitter,
        )
    }

    /// Single attempt, no retries
    pub fn none() -> Self {
        Self::new(Vec::new(), false)
    }

    pub fn max_attempts(&self) -> usize {
        self.delays.len() + 1
    }

    /// Run `op` until it succeeds or the ladder is exhausted; the last error is returned
    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 0;
        loop {
            match op(attempt).await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(operation, attempt, "Retry succeeded");
                    }
                    return Ok(value);
                }
                Err(err) => {
                    let Some(delay) = self.delay_for(attempt) else {
                        warn!(operation, attempts = attempt + 1, error = %err, "Retry ladder exhausted");
                        return Err(err);
                    };
                    debug!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    fn delay_for(&self, attempt: usize) -> Option<Duration> {
        let delay = *self.delays.get(attempt)?;
        if self.jitter {
            Some(jittered_backoff(&mut rand::thread_rng(), delay))
        } else {
            Some(delay)
        }
    }
}

/// "Equal jitter": the delay lands in `[backoff/2, backoff]`
pub(crate) fn jittered_backoff(rng: &mut impl RngCore, backoff: Duration) -> Duration {
    let backoff_ms = backoff.as_millis() as u64;
    if backoff_ms <= 1 {
        return backoff;
    }
    let half_ms = backoff_ms / 2;
    let jitter_ms = rng.gen_range(0..=half_ms);
    Duration::from_millis(half_ms.saturating_add(jitter_ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ladder(delays_ms: &[u64]) -> RetryLadder {
        RetryLadder::new(
            delays_ms.iter().map(|ms| Duration::from_millis(*ms)).collect(),
            false,
        )
    }

    #[tokio::test]
    async fn test_succeeds_after_failures() {
        let calls = AtomicUsize::new(0);
        let result: Result<u32, String> = ladder(&[1, 1, 1])
            .run("flaky", |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 2 {
                        Err(format!("attempt {} failed", attempt))
                    } else {
                        Ok(7)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_error() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), String> = ladder(&[1, 1])
            .run("always failing", |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(format!("failure {}", attempt)) }
            })
            .await;

        assert_eq!(result, Err("failure 2".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_none_makes_single_attempt() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), &str> = RetryLadder::none()
            .run("once", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("nope") }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_from_config() {
        let ladder = RetryLadder::from_config(&RetryConfig::default());
        assert_eq!(ladder.max_attempts(), 5);
    }

    #[test]
    fn test_jitter_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let delay = jittered_backoff(&mut rng, Duration::from_millis(1_000));
            assert!(delay >= Duration::from_millis(500));
            assert!(delay <= Duration::from_millis(1_000));
        }
        assert_eq!(
            jittered_backoff(&mut rng, Duration::from_millis(1)),
            Duration::from_millis(1)
        );
    }
}
