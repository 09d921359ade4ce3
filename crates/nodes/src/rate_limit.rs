//! Sliding-window throttle for provider calls.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

const MINUTE: Duration = Duration::from_secs(60);

/// Admits at most `max_calls` provider calls in any window of `window`
/// length. Callers that would exceed the budget wait for the oldest call to
/// age out.
#[derive(Debug)]
pub struct CallRateLimiter {
    max_calls: Option<u32>,
    window: Duration,
    calls: VecDeque<Instant>,
}

impl CallRateLimiter {
    /// A limiter over one-minute windows; `None` admits everything.
    pub fn per_minute(max_calls: Option<u32>) -> Self {
        Self::new(max_calls, MINUTE)
    }

    pub fn new(max_calls: Option<u32>, window: Duration) -> Self {
        Self {
            max_calls,
            window,
            calls: VecDeque::new(),
        }
    }

    /// How long a call made at `now` would have to wait, or `None` if it may
    /// go ahead immediately.
    pub fn delay_at(&mut self, now: Instant) -> Option<Duration> {
        let max = self.max_calls? as usize;
        while let Some(&oldest) = self.calls.front() {
            if now.duration_since(oldest) >= self.window {
                self.calls.pop_front();
            } else {
                break;
            }
        }
        if self.calls.len() < max {
            return None;
        }
        let oldest = *self.calls.front()?;
        Some(self.window.saturating_sub(now.duration_since(oldest)))
    }

    /// Records a call made at `at`.
    pub fn record(&mut self, at: Instant) {
        if self.max_calls.is_some() {
            self.calls.push_back(at);
        }
    }

    /// Waits until a call is admitted, then records it.
    pub async fn acquire(&mut self) {
        loop {
            let now = Instant::now();
            match self.delay_at(now) {
                None => {
                    self.record(now);
                    return;
                }
                Some(delay) => {
                    tracing::debug!(delay_ms = delay.as_millis() as u64, "Call rate limit reached; waiting");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
