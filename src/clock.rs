//! Wall-clock source for snapshot capture times

use chrono::{DateTime, Utc};

/// Capture-time format for versioned keys: human-sortable, second resolution
pub const CAPTURE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// System wall clock (UTC)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Format a capture time for embedding in a key
pub fn format_capture_time(time: &DateTime<Utc>) -> String {
    time.format(CAPTURE_TIME_FORMAT).to_string()
}
