//! Clock and id implementations.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::infrastructure::ports::{ClockPort, IdPort};

/// System clock - uses real time.
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClockPort for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// System ids - random v4 UUIDs.
pub struct SystemIds;

impl SystemIds {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemIds {
    fn default() -> Self {
        Self::new()
    }
}

impl IdPort for SystemIds {
    fn next_id(&self) -> Uuid {
        Uuid::new_v4()
    }
}

/// Virtual clock for testing.
///
/// `sleep` advances the clock instead of waiting, so code that delays by
/// exact amounts can be asserted against exact timestamps.
#[cfg(test)]
pub struct ManualClock {
    now: std::sync::Mutex<DateTime<Utc>>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: std::sync::Mutex::new(start),
        }
    }

    /// Clock frozen at the Unix epoch, handy for millisecond assertions.
    pub fn at_epoch() -> Self {
        Self::new(DateTime::<Utc>::UNIX_EPOCH)
    }

    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += chrono::Duration::from_std(duration).unwrap();
    }

    /// Milliseconds elapsed since `start`.
    pub fn millis_since(&self, start: DateTime<Utc>) -> i64 {
        (self.now() - start).num_milliseconds()
    }
}

#[cfg(test)]
#[async_trait]
impl ClockPort for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        self.advance(duration);
        tokio::task::yield_now().await;
    }
}

/// Fixed ids for testing.
#[cfg(test)]
pub struct FixedIds(pub Uuid);

#[cfg(test)]
impl IdPort for FixedIds {
    fn next_id(&self) -> Uuid {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn manual_clock_sleep_advances_time() {
        let clock = ManualClock::at_epoch();
        let start = clock.now();

        clock.sleep(Duration::from_millis(1500)).await;

        assert_eq!(clock.millis_since(start), 1500);
    }

    #[test]
    fn system_ids_are_unique() {
        let ids = SystemIds::new();
        assert_ne!(ids.next_id(), ids.next_id());
    }
}
