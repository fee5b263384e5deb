//! Daily start trigger for scheduled runs
//!
//! A run that is not started immediately waits for a fixed local
//! wall-clock instant. If that instant has already passed today, the
//! same instant tomorrow is used.

use chrono::{DateTime, Duration, Local, NaiveDateTime, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};

/// Default daily trigger, a few seconds before the portal opens bookings
pub const DEFAULT_TRIGGER_TIME: &str = "12:29:56";

/// Fixed daily wall-clock instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTrigger {
    at: NaiveTime,
}

impl Default for DailyTrigger {
    fn default() -> Self {
        Self {
            at: NaiveTime::from_hms_opt(12, 29, 56).unwrap_or(NaiveTime::MIN),
        }
    }
}

impl DailyTrigger {
    pub fn new(at: NaiveTime) -> Self {
        Self { at }
    }

    pub fn at(&self) -> NaiveTime {
        self.at
    }

    /// Next occurrence strictly after `now`
    pub fn next_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date().and_time(self.at);
        if today > now {
            today
        } else {
            today + Duration::days(1)
        }
    }

    /// Next occurrence in local time
    pub fn next_local(&self, now: DateTime<Local>) -> DateTime<Local> {
        let target = self.next_after(now.naive_local());
        // Skipped by a DST change: fall back to the naive instant an hour later
        Local
            .from_local_datetime(&target)
            .earliest()
            .or_else(|| Local.from_local_datetime(&(target + Duration::hours(1))).earliest())
            .unwrap_or(now)
    }

}

/// Time left until a fixed `target`, zero once it has passed
pub fn time_left(target: DateTime<Local>, now: DateTime<Local>) -> std::time::Duration {
    target.signed_duration_since(now).to_std().unwrap_or_default()
}
