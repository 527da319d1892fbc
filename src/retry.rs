//! Retry with exponential backoff for transient transport failures

use std::future::Future;
use std::time::Duration;
use log::{debug, warn};
use crate::error::Error;

/// Retry policy for failed requests
#[derive(Debug, Clone)]
pub struct RetryPolicy
{   pub max_attempts: u32
  , pub backoff_multiplier: f32
  , pub initial_backoff: Duration
  , pub max_backoff: Duration
}

/// Final outcome plus every delay slept before a retry
#[derive(Debug)]
pub struct Retried<T>
{   pub result: Result<T, Error>
  , pub delays: Vec<Duration>
}

impl RetryPolicy
{   /// Create a new retry policy
    pub fn new(
      max_attempts: u32
    , backoff_multiplier: f32
    , initial_backoff_ms: u64
    ) -> Self
    {   RetryPolicy
        {   max_attempts: max_attempts.max(1)
          , backoff_multiplier
          , initial_backoff: Duration::from_millis(
              initial_backoff_ms
            )
          , max_backoff: Duration::from_secs(30)
        }
    }

    pub fn from_config(config: &crate::config::RetryConfig) -> Self
    {   let mut policy = RetryPolicy::new(
          config.max_attempts,
          config.backoff_multiplier,
          config.initial_backoff_ms
        );
        policy.max_backoff = Duration::from_millis(config.max_backoff_ms);
        policy
    }

    /// Calculate backoff duration before retry number `attempt` (0-based)
    pub fn backoff_for_attempt(
      &self
    , attempt: u32
    ) -> Duration
    {   let multiplier
          = self.backoff_multiplier.powi(attempt as i32) as f64;
        let millis
          = self.initial_backoff.as_millis() as f64 * multiplier;
        Duration::from_millis(millis as u64).min(self.max_backoff)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or
    /// `max_attempts` is reached. `op` receives the 1-based attempt number;
    /// `on_retry` sees the error and the delay about to be slept.
    pub async fn run<T, F, Fut, R>(
      &self
    , mut op: F
    , mut on_retry: R
    ) -> Retried<T>
    where
      F: FnMut(u32) -> Fut
    , Fut: Future<Output = Result<T, Error>>
    , R: FnMut(u32, &Error, Duration)
    {   let mut delays = Vec::new();
        let mut attempt = 1;
        loop
        {   match op(attempt).await
            {   Ok(value) => {
                  return Retried { result: Ok(value), delays };
                }
              , Err(e) if !e.is_retryable() => {
                  debug!("Not retrying attempt {}: {}", attempt, e);
                  return Retried { result: Err(e), delays };
                }
              , Err(e) if attempt >= self.max_attempts => {
                  warn!(
                    "Giving up after {} attempts: {}",
                    attempt, e
                  );
                  return Retried { result: Err(e), delays };
                }
              , Err(e) => {
                  let delay = self.backoff_for_attempt(attempt - 1);
                  on_retry(attempt, &e, delay);
                  delays.push(delay);
                  tokio::time::sleep(delay).await;
                  attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy
{   fn default() -> Self
    {   RetryPolicy::new(3, 2.0, 1000)
    }
}

#[cfg(test)]
mod tests
{   use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn backoff_grows_geometrically_and_caps()
    {   let mut policy = RetryPolicy::new(10, 2.0, 100);
        policy.max_backoff = Duration::from_millis(500);
        assert_eq!(policy.backoff_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.backoff_for_attempt(1), Duration::from_millis(200));
        assert_eq!(policy.backoff_for_attempt(2), Duration::from_millis(400));
        assert_eq!(policy.backoff_for_attempt(3), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_error_is_attempted_once()
    {   let calls = AtomicU32::new(0);
        let retried: Retried<()> = RetryPolicy::default()
          .run(
            |_| {
              calls.fetch_add(1, Ordering::SeqCst);
              async { Err(Error::from_status(401, "bad key")) }
            },
            |_, _, _| {}
          )
          .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(retried.delays.is_empty());
        assert!(retried.result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn retryable_error_stops_at_max_attempts()
    {   let calls = AtomicU32::new(0);
        let retried: Retried<()> = RetryPolicy::new(3, 2.0, 10)
          .run(
            |_| {
              calls.fetch_add(1, Ordering::SeqCst);
              async { Err(Error::from_status(503, "down")) }
            },
            |_, _, _| {}
          )
          .await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
          retried.delays,
          vec![Duration::from_millis(10), Duration::from_millis(20)]
        );
        assert_eq!(
          retried.result.unwrap_err(),
          Error::from_status(503, "down")
        );
    }
}
