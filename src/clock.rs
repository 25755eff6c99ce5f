use chrono::{DateTime, Utc};

/// Source of the current time. Production code uses [`SystemClock`]; tests
/// substitute a clock they can move forward by hand.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
