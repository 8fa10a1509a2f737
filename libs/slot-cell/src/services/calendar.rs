// libs/slot-cell/src/services/calendar.rs
use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

/// Source of the facility-wide wall clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Manually driven clock for tests and simulations.
#[derive(Debug)]
pub struct FixedClock {
    seconds: AtomicI64,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            seconds: AtomicI64::new(now.and_utc().timestamp()),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        self.seconds.store(now.and_utc().timestamp(), Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.seconds.fetch_add(by.num_seconds(), Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        DateTime::from_timestamp(self.seconds.load(Ordering::SeqCst), 0)
            .map(|instant| instant.naive_utc())
            .unwrap_or(NaiveDateTime::MIN)
    }
}

/// `7 * weeks` consecutive dates beginning with `start`.
pub fn dates_in_horizon(start: NaiveDate, weeks: u32) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take(weeks as usize * 7)
}

/// Dates of the horizon that fall on one of `weekdays`.
pub fn matching_dates(start: NaiveDate, weeks: u32, weekdays: &[Weekday]) -> Vec<NaiveDate> {
    let wanted: HashSet<Weekday> = weekdays.iter().copied().collect();
    dates_in_horizon(start, weeks)
        .filter(|date| wanted.contains(&date.weekday()))
        .collect()
}

/// Overlap test on half-open intervals `[a_start, a_end)` and `[b_start, b_end)`.
pub fn intervals_overlap<T: PartialOrd>(a_start: T, a_end: T, b_start: T, b_end: T) -> bool {
    a_start < b_end && b_start < a_end
}

pub fn minutes_between(start: NaiveTime, end: NaiveTime) -> i64 {
    (end - start).num_minutes()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn horizon_spans_whole_weeks() {
        let dates: Vec<_> = dates_in_horizon(d(2030, 1, 7), 2).collect();
        assert_eq!(dates.len(), 14);
        assert_eq!(dates.first(), Some(&d(2030, 1, 7)));
        assert_eq!(dates.last(), Some(&d(2030, 1, 20)));
    }

    #[test]
    fn matching_dates_filters_weekdays() {
        // 2030-01-07 is a Monday.
        let dates = matching_dates(d(2030, 1, 7), 2, &[Weekday::Mon, Weekday::Thu]);
        assert_eq!(
            dates,
            vec![d(2030, 1, 7), d(2030, 1, 10), d(2030, 1, 14), d(2030, 1, 17)]
        );
        assert!(matching_dates(d(2030, 1, 7), 2, &[]).is_empty());
    }

    #[test]
    fn half_open_overlap() {
        assert!(intervals_overlap(1, 3, 2, 4));
        assert!(!intervals_overlap(1, 2, 2, 3));
        assert!(intervals_overlap(1, 5, 2, 3));
    }

    #[test]
    fn fixed_clock_moves_only_when_told() {
        let start = d(2030, 1, 7).and_hms_opt(8, 0, 0).unwrap();
        let clock = FixedClock::new(start);
        assert_eq!(clock.now(), start);
        assert_eq!(clock.today(), d(2030, 1, 7));

        clock.advance(Duration::hours(20));
        assert_eq!(clock.today(), d(2030, 1, 8));

        clock.set(start);
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn minutes_between_times() {
        let a = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let b = NaiveTime::from_hms_opt(13, 30, 0).unwrap();
        assert_eq!(minutes_between(a, b), 270);
    }
}
