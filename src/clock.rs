//! Wall-clock source for artifact names and dashboard timestamps.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Local};

/// Source of the current local time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// The system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A manually driven clock. Every call returns the same instant until
/// `advance` or `set` moves it.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Local>>,
}

impl ManualClock {
    pub fn new(at: DateTime<Local>) -> Self {
        Self {
            now: Mutex::new(at),
        }
    }

    pub fn set(&self, at: DateTime<Local>) {
        *self.lock() = at;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.lock();
        *now += by;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DateTime<Local>> {
        // A poisoned guard still holds a valid timestamp.
        self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        *self.lock()
    }
}
