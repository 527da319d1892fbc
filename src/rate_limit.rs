//! Rolling window rate limiter

use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use log::{debug, trace};

/// Sliding window of `calls` permits per `period`.
///
/// `acquire` never fails; it sleeps until the oldest permit in the window
/// expires. The lock is released before sleeping so other tasks holding
/// the same limiter can observe the window.
#[derive(Debug)]
pub struct RateLimiter
{   calls: usize
  , period: Duration
  , issued: Mutex<VecDeque<Instant>>
}

impl RateLimiter
{   pub fn new(calls: u32, period: Duration) -> Self
    {   debug!("Creating rate limiter: {} calls per {:?}", calls, period);
        RateLimiter
        {   calls: calls.max(1) as usize
          , period
          , issued: Mutex::new(VecDeque::new())
        }
    }

    pub fn from_config(config: &crate::config::RateLimitConfig) -> Self
    {   Self::new(config.calls, Duration::from_secs(config.period_secs))
    }

    /// Wait for a permit. Returns how long the caller was suspended.
    pub async fn acquire(&self) -> Duration
    {   let start = Instant::now();
        loop
        {   let wait = {
              let mut issued = self.issued.lock().await;
              let now = Instant::now();
              while let Some(oldest) = issued.front()
              {   if now.duration_since(*oldest) >= self.period
                  {   issued.pop_front();
                  } else
                  {   break;
                  }
              }
              if issued.len() < self.calls
              {   issued.push_back(now);
                  trace!("Permit granted, {} in window", issued.len());
                  return now.duration_since(start);
              }
              // window full; an expiry past the clock's range waits a whole period
              match issued.front().map(|oldest| oldest.checked_add(self.period))
              {   Some(Some(expires)) => expires.saturating_duration_since(now)
                , Some(None) => self.period
                , None => Duration::ZERO
              }
            };
            debug!("Rate limit window full, waiting {:?}", wait);
            tokio::time::sleep(wait).await;
        }
    }

    /// Permits still free in the current window
    pub async fn available(&self) -> usize
    {   let issued = self.issued.lock().await;
        let now = Instant::now();
        let live = issued.iter()
          .filter(|t| now.duration_since(**t) < self.period)
          .count();
        self.calls.saturating_sub(live)
    }
}
