//! Canonical date and time-window strings used by every portal endpoint

use chrono::{Datelike, NaiveDate};

use crate::error::{Error, Result};
use crate::models::SlotTime;

/// A one-hour window on a given day, rendered the way the portal expects
///
/// Pure value: everything is derived from `(date, start_hour, end_hour)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityWindow {
    date: NaiveDate,
    start_hour: u32,
    end_hour: u32,
}

impl AvailabilityWindow {
    /// Build a window from calendar parts
    pub fn from_parts(year: i32, month: u32, day: u32, start_hour: u32, end_hour: u32) -> Result<Self> {
        let date = NaiveDate::from_ymd_opt(year, month, day)
            .ok_or_else(|| Error::config(format!("Invalid date {year}-{month}-{day}")))?;

        if start_hour >= end_hour || end_hour > 24 {
            return Err(Error::config(format!(
                "Invalid window {start_hour}-{end_hour}"
            )));
        }

        Ok(Self {
            date,
            start_hour,
            end_hour,
        })
    }

    /// The one-hour window starting at `time` on `date`
    pub fn for_slot(date: NaiveDate, time: SlotTime) -> Self {
        let start_hour = u32::from(time.hour);
        Self {
            date,
            start_hour,
            end_hour: start_hour + 1,
        }
    }

    /// `YYYY-MM-DD`, month and day zero-padded independently
    pub fn date_string(&self) -> String {
        format!(
            "{}-{:02}-{:02}",
            self.date.year(),
            self.date.month(),
            self.date.day()
        )
    }

    /// `HH:00-HH:00`
    pub fn code(&self) -> String {
        format!("{}-{}", self.start_clock(), self.end_clock())
    }

    /// `HH:00` of the start hour
    pub fn start_clock(&self) -> String {
        format!("{:02}:00", self.start_hour)
    }

    /// `HH:00` of the end hour
    pub fn end_clock(&self) -> String {
        format!("{:02}:00", self.end_hour)
    }

    /// `YYYY-MM-DD HH:00`
    pub fn start_stamp(&self) -> String {
        format!("{} {}", self.date_string(), self.start_clock())
    }

    /// `YYYY-MM-DD HH:00`
    pub fn end_stamp(&self) -> String {
        format!("{} {}", self.date_string(), self.end_clock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_single_digit_month_and_day() {
        let w = AvailabilityWindow::from_parts(2024, 9, 5, 20, 21).unwrap();
        assert_eq!(w.date_string(), "2024-09-05");
    }

    #[test]
    fn test_padding_is_per_field() {
        let w = AvailabilityWindow::from_parts(2024, 11, 5, 20, 21).unwrap();
        assert_eq!(w.date_string(), "2024-11-05");

        let w = AvailabilityWindow::from_parts(2024, 9, 15, 20, 21).unwrap();
        assert_eq!(w.date_string(), "2024-09-15");

        let w = AvailabilityWindow::from_parts(2024, 12, 25, 20, 21).unwrap();
        assert_eq!(w.date_string(), "2024-12-25");
    }

    #[test]
    fn test_window_code_pads_end_hour() {
        let w = AvailabilityWindow::from_parts(2024, 9, 17, 8, 9).unwrap();
        assert_eq!(w.code(), "08:00-09:00");

        let w = AvailabilityWindow::from_parts(2024, 9, 17, 9, 10).unwrap();
        assert_eq!(w.code(), "09:00-10:00");

        let w = AvailabilityWindow::from_parts(2024, 9, 17, 20, 21).unwrap();
        assert_eq!(w.code(), "20:00-21:00");
    }

    #[test]
    fn test_stamps() {
        let w = AvailabilityWindow::from_parts(2024, 9, 17, 20, 21).unwrap();
        assert_eq!(w.start_stamp(), "2024-09-17 20:00");
        assert_eq!(w.end_stamp(), "2024-09-17 21:00");
        assert_eq!(w.start_clock(), "20:00");
        assert_eq!(w.end_clock(), "21:00");
    }

    #[test]
    fn test_for_slot() {
        let date = NaiveDate::from_ymd_opt(2024, 9, 17).unwrap();
        let w = AvailabilityWindow::for_slot(date, SlotTime { hour: 19, minute: 0 });
        assert_eq!(w.code(), "19:00-20:00");
    }

    #[test]
    fn test_invalid_parts() {
        assert!(AvailabilityWindow::from_parts(2024, 2, 30, 20, 21).is_err());
        assert!(AvailabilityWindow::from_parts(2024, 9, 17, 21, 20).is_err());
    }

    proptest! {
        #[test]
        fn prop_date_string_zero_padded(year in 2000i32..2100, month in 1u32..=12, day in 1u32..=28) {
            let w = AvailabilityWindow::from_parts(year, month, day, 10, 11).unwrap();
            let expected = format!("{year}-{month:02}-{day:02}");
            prop_assert_eq!(w.date_string(), expected);
            prop_assert_eq!(w.date_string().len(), 10);
        }

        #[test]
        fn prop_window_code_shape(start in 0u32..23) {
            let w = AvailabilityWindow::from_parts(2024, 9, 17, start, start + 1).unwrap();
            prop_assert_eq!(w.code(), format!("{:02}:00-{:02}:00", start, start + 1));
            prop_assert_eq!(w.code().len(), 11);
        }
    }
}
