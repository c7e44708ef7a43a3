//! Wall-clock access

use chrono::{Local, NaiveDateTime};

/// Source of the current local date and time
pub trait Clock: Send + Sync {
    /// Current local wall-clock time
    fn now(&self) -> NaiveDateTime;
}

/// Clock backed by the operating system's local time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Format a time of day the way it is spoken back, e.g. `03:07 PM`
#[must_use]
pub fn spoken_time(now: NaiveDateTime) -> String {
    now.format("%I:%M %p").to_string()
}
