//! Deadline-based countdown.
//!
//! Remaining time is always `end_at - now`, never an accumulated counter, so a
//! host that stops ticking (sleep, backgrounding) is correct again on its next
//! tick.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseClock {
    /// Absolute instant at which the countdown reaches zero. `None` while frozen.
    end_at: Option<DateTime<Utc>>,
    /// Frozen remaining seconds, authoritative only while `end_at` is `None`.
    remaining_secs: u32,
}

impl PhaseClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// A stopped clock showing `duration_secs` without counting down.
    pub fn frozen(duration_secs: u32) -> Self {
        Self {
            end_at: None,
            remaining_secs: duration_secs,
        }
    }

    pub fn start(&mut self, duration_secs: u32, now: DateTime<Utc>) -> DateTime<Utc> {
        let end = now + Duration::seconds(i64::from(duration_secs));
        self.end_at = Some(end);
        self.remaining_secs = duration_secs;
        end
    }

    /// Seconds left at `now`, rounded up and clamped at zero.
    pub fn remaining(&self, now: DateTime<Utc>) -> u32 {
        match self.end_at {
            Some(end) => secs_between(now, end),
            None => self.remaining_secs,
        }
    }

    pub fn pause(&mut self, now: DateTime<Utc>) {
        if self.end_at.is_some() {
            self.remaining_secs = self.remaining(now);
            self.end_at = None;
        }
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        if let Some(end) = self.end_at {
            return end;
        }
        let end = now + Duration::seconds(i64::from(self.remaining_secs));
        self.end_at = Some(end);
        end
    }

    /// Stop and show `duration_secs`.
    pub fn freeze_at(&mut self, duration_secs: u32) {
        self.end_at = None;
        self.remaining_secs = duration_secs;
    }

    pub fn end_at(&self) -> Option<DateTime<Utc>> {
        self.end_at
    }

    pub fn is_counting(&self) -> bool {
        self.end_at.is_some()
    }
}

fn secs_between(now: DateTime<Utc>, end: DateTime<Utc>) -> u32 {
    let ms = (end - now).num_milliseconds();
    if ms <= 0 {
        return 0;
    }
    let secs = (ms + 999) / 1000;
    u32::try_from(secs).unwrap_or(u32::MAX)
}
