use chrono::{DateTime, Duration, Utc};

/// Clock abstraction so retention, TTL and SLA arithmetic is testable.
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

/// Deterministic clock for tests; starts at a caller-provided instant and
/// only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: parking_lot::RwLock<DateTime<Utc>>,
}

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: parking_lot::RwLock::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.write() = now;
    }

    pub fn advance_days(&self, days: i64) {
        let mut guard = self.now.write();
        *guard += Duration::days(days);
    }

    pub fn advance(&self, delta: Duration) {
        let mut guard = self.now.write();
        *guard += delta;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read()
    }
}
