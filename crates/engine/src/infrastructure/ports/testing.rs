//! Testability ports for injecting time and identifiers.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

// =============================================================================
// Testability Ports
// =============================================================================

/// Time source. Waiting goes through the clock too, so a virtual clock can
/// make delays instantaneous and still report exact timestamps.
#[async_trait]
pub trait ClockPort: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    async fn sleep(&self, duration: Duration);
}

/// Source of identifiers stamped onto generated objects.
pub trait IdPort: Send + Sync {
    fn next_id(&self) -> Uuid;
}
