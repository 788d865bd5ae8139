//! Rate-limited director wrapper with rolling-window admission
//!
//! Wraps any NarrativeDirectorPort so that no `interval`-long span ever holds
//! more than `max_requests` admitted calls. Calls over quota are delayed until
//! the oldest admission leaves the window, never rejected.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use buttonburgh_domain::NarrativeEventResponse;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::infrastructure::ports::{ClockPort, DirectorError, NarrativeDirectorPort, PromptAssembly};

/// Configuration for admission control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Calls admitted per interval (at least 1)
    pub max_requests: u32,
    /// Window length
    pub interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            interval: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    /// A zero quota would stall every caller forever, so it is raised to 1.
    pub fn new(max_requests: u32, interval: Duration) -> Self {
        if max_requests == 0 {
            tracing::warn!("Rate limit max_requests of 0 raised to 1");
        }
        Self {
            max_requests: max_requests.max(1),
            interval,
        }
    }

    pub fn from_millis(max_requests: u32, interval_ms: u64) -> Self {
        Self::new(max_requests, Duration::from_millis(interval_ms))
    }
}

/// Wrapper that delays calls exceeding the configured rate
pub struct RateLimitedDirector {
    inner: Arc<dyn NarrativeDirectorPort>,
    config: RateLimitConfig,
    clock: Arc<dyn ClockPort>,
    /// Times of the most recent admissions, oldest first (at most
    /// `max_requests`). tokio's Mutex queues waiters in arrival order.
    admissions: Mutex<VecDeque<DateTime<Utc>>>,
    label: &'static str,
}

impl RateLimitedDirector {
    pub fn new(
        inner: Arc<dyn NarrativeDirectorPort>,
        config: RateLimitConfig,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        let config = RateLimitConfig::new(config.max_requests, config.interval);
        Self {
            inner,
            config,
            clock,
            admissions: Mutex::new(VecDeque::with_capacity(config.max_requests as usize)),
            label: "director",
        }
    }

    /// Name used in log events (e.g. "sandbox", "live")
    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Wait for a slot and claim it. Returns the admission time.
    ///
    /// The lock is held across the wait so later arrivals queue behind the
    /// delayed caller. Admissions are only recorded once the wait completes,
    /// so a caller dropped mid-wait leaves the log untouched.
    async fn admit(&self) -> DateTime<Utc> {
        let mut admissions = self.admissions.lock().await;
        let now = self.clock.now();
        expire(&mut admissions, now, self.config.interval);

        if admissions.len() < self.config.max_requests as usize {
            admissions.push_back(now);
            return now;
        }

        let oldest = admissions.front().copied().unwrap_or(now);
        let delay = self.config.interval.saturating_sub(elapsed(oldest, now));
        tracing::debug!(
            limiter = self.label,
            delay_ms = delay.as_millis() as u64,
            max_requests = self.config.max_requests,
            interval_ms = self.config.interval.as_millis() as u64,
            "Rate limit reached, delaying dispatch"
        );
        self.clock.sleep(delay).await;

        let now = self.clock.now();
        admissions.pop_front();
        expire(&mut admissions, now, self.config.interval);
        admissions.push_back(now);
        now
    }

    #[cfg(test)]
    async fn admitted_in_window(&self) -> usize {
        self.admissions.lock().await.len()
    }
}

/// Drop admissions that are a full interval old.
fn expire(admissions: &mut VecDeque<DateTime<Utc>>, now: DateTime<Utc>, interval: Duration) {
    while admissions
        .front()
        .is_some_and(|oldest| elapsed(*oldest, now) >= interval)
    {
        admissions.pop_front();
    }
}

fn elapsed(since: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    // A clock that moved backwards counts as no time elapsed.
    (now - since).to_std().unwrap_or(Duration::ZERO)
}

#[async_trait]
impl NarrativeDirectorPort for RateLimitedDirector {
    async fn generate(
        &self,
        assembly: &PromptAssembly,
    ) -> Result<NarrativeEventResponse, DirectorError> {
        let admitted_at = self.admit().await;
        tracing::trace!(limiter = self.label, %admitted_at, "Dispatch admitted");
        self.inner.generate(assembly).await
    }
}
