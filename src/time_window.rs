//! Day/night period boundaries derived from two minute-of-day settings.
//!
//! The configuration stores the beginning of the day period (`pref_start`) and
//! the beginning of the night period (`pref_end`) as minutes after midnight.
//! This module turns them into the next absolute instants at which each period
//! begins and decides which period is active right now.
//!
//! ## Which period are we in?
//!
//! There is no "is now between start and end" test. Both boundaries are
//! projected to their next future occurrence, and whichever comes *later*
//! names the period we are currently in: if the next night begins before the
//! next day does, it is day now. This works unchanged when the night period
//! wraps across midnight and when `pref_start` is later in the day than
//! `pref_end`.
//!
//! Functions are generic over the chrono time zone so tests can run on fixed
//! offsets while the daemon runs on `Local`.

use chrono::{DateTime, Days, Duration, NaiveDate, NaiveTime, TimeZone};
use std::fmt;
use std::time::Duration as StdDuration;

use crate::config::Config;
use crate::constants::MINUTES_PER_DAY;

/// The display color profile that should be active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    Day,
    Night,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Day => "day",
            Period::Night => "night",
        }
    }

    pub fn opposite(&self) -> Period {
        match self {
            Period::Day => Period::Night,
            Period::Night => Period::Day,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convert a minute-of-day value to a wall-clock time with seconds zeroed.
///
/// Values of a full day or more wrap around; validation keeps them out of the
/// configuration, this only guards the arithmetic.
pub fn minute_to_time(minute_of_day: u32) -> NaiveTime {
    let minute_of_day = minute_of_day % MINUTES_PER_DAY;
    NaiveTime::from_hms_opt(minute_of_day / 60, minute_of_day % 60, 0).unwrap_or_default()
}

/// Resolve a local wall-clock time on `date` in `tz`.
///
/// Ambiguous times (clocks set back) resolve to the earlier instant. Times
/// inside a forward gap do not exist and resolve to the same wall time one
/// hour later, which lands just after the gap.
fn localize<Tz: TimeZone>(tz: &Tz, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Tz>> {
    let naive = date.and_time(time);
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
}

/// Next instant strictly after `now` whose wall-clock time is `minute_of_day`.
///
/// Today's candidate is used when it is still in the future, otherwise the
/// candidate moves forward by exactly one calendar day.
pub fn next_occurrence<Tz: TimeZone>(minute_of_day: u32, now: &DateTime<Tz>) -> DateTime<Tz> {
    let tz = now.timezone();
    let time = minute_to_time(minute_of_day);
    let today = now.date_naive();

    // Tomorrow's candidate is always after now; the third day only matters
    // when tomorrow's wall time is unrepresentable in the zone.
    for offset in 0..=2 {
        let Some(date) = today.checked_add_days(Days::new(offset)) else {
            break;
        };
        if let Some(candidate) = localize(&tz, date, time) {
            if candidate > *now {
                return candidate;
            }
        }
    }

    now.clone() + Duration::days(1)
}

/// True when we are currently in the day period.
///
/// That is the case iff the next day boundary lies after the next night
/// boundary. Equal instants (start == end) compare as night; callers must not
/// rely on that.
pub fn is_currently_day<Tz: TimeZone>(
    next_day_begin: &DateTime<Tz>,
    next_night_begin: &DateTime<Tz>,
) -> bool {
    next_day_begin > next_night_begin
}

/// The next beginning of each period, computed at one instant.
#[derive(Debug, Clone)]
pub struct DayNightWindow<Tz: TimeZone> {
    pub next_day_begin: DateTime<Tz>,
    pub next_night_begin: DateTime<Tz>,
}

impl<Tz: TimeZone> DayNightWindow<Tz> {
    pub fn compute(start_minute: u32, end_minute: u32, now: &DateTime<Tz>) -> Self {
        Self {
            next_day_begin: next_occurrence(start_minute, now),
            next_night_begin: next_occurrence(end_minute, now),
        }
    }

    pub fn from_config(config: &Config, now: &DateTime<Tz>) -> Self {
        Self::compute(config.start_minute(), config.end_minute(), now)
    }

    pub fn is_day(&self) -> bool {
        is_currently_day(&self.next_day_begin, &self.next_night_begin)
    }

    pub fn current_period(&self) -> Period {
        if self.is_day() { Period::Day } else { Period::Night }
    }

    /// The period that begins at the nearer boundary, and when.
    pub fn next_boundary(&self) -> (Period, &DateTime<Tz>) {
        match self.current_period() {
            Period::Day => (Period::Night, &self.next_night_begin),
            Period::Night => (Period::Day, &self.next_day_begin),
        }
    }

    /// Time left until the nearer boundary, zero if it has already passed.
    pub fn time_until_next_boundary(&self, now: &DateTime<Tz>) -> StdDuration {
        let (_, at) = self.next_boundary();
        (at.clone() - now.clone()).to_std().unwrap_or(StdDuration::ZERO)
    }

    /// Begin of the given period.
    pub fn begin_of(&self, period: Period) -> &DateTime<Tz> {
        match period {
            Period::Day => &self.next_day_begin,
            Period::Night => &self.next_night_begin,
        }
    }
}

/// Current period for `config` at `now`.
pub fn period_at<Tz: TimeZone>(config: &Config, now: &DateTime<Tz>) -> Period {
    DayNightWindow::from_config(config, now).current_period()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::test_constants::*;
    use chrono::{FixedOffset, Timelike, Utc};

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_minute_to_time() {
        assert_eq!(minute_to_time(0), NaiveTime::from_hms_opt(0, 0, 0).unwrap());
        assert_eq!(minute_to_time(480), NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        assert_eq!(minute_to_time(1439), NaiveTime::from_hms_opt(23, 59, 0).unwrap());
        // Out-of-range values wrap instead of panicking
        assert_eq!(minute_to_time(1440), NaiveTime::from_hms_opt(0, 0, 0).unwrap());
    }

    #[test]
    fn test_next_occurrence_later_today() {
        let now = utc(2025, 1, 15, 6, 0, 0);
        assert_eq!(next_occurrence(480, &now), utc(2025, 1, 15, 8, 0, 0));
    }

    #[test]
    fn test_next_occurrence_rolls_to_tomorrow() {
        let now = utc(2025, 1, 15, 21, 0, 0);
        assert_eq!(next_occurrence(1200, &now), utc(2025, 1, 16, 20, 0, 0));
    }

    #[test]
    fn test_next_occurrence_exact_boundary_is_not_future() {
        // A boundary equal to now is not strictly after it
        let now = utc(2025, 1, 15, 8, 0, 0);
        assert_eq!(next_occurrence(480, &now), utc(2025, 1, 16, 8, 0, 0));
    }

    #[test]
    fn test_next_occurrence_zeroes_seconds() {
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 7, 59, 42).unwrap()
            + Duration::milliseconds(517);
        let next = next_occurrence(480, &now);
        assert_eq!(next.second(), 0);
        assert_eq!(next.nanosecond(), 0);
        assert_eq!(next, utc(2025, 1, 15, 8, 0, 0));
    }

    #[test]
    fn test_next_occurrence_month_and_year_rollover() {
        let now = utc(2025, 12, 31, 23, 0, 0);
        assert_eq!(next_occurrence(30, &now), utc(2026, 1, 1, 0, 30, 0));
    }

    #[test]
    fn test_next_occurrence_keeps_offset() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2025, 6, 1, 22, 15, 0).unwrap();
        let next = next_occurrence(TEST_STANDARD_END, &now);
        assert_eq!(next, tz.with_ymd_and_hms(2025, 6, 2, 20, 0, 0).unwrap());
        assert_eq!(next.offset(), now.offset());
    }

    #[test]
    fn test_is_currently_day_comparison() {
        let a = utc(2025, 1, 16, 8, 0, 0);
        let b = utc(2025, 1, 15, 20, 0, 0);
        assert!(is_currently_day(&a, &b));
        assert!(!is_currently_day(&b, &a));
    }

    #[test]
    fn test_window_early_morning_is_night() {
        let now = utc(2025, 1, 15, 6, 0, 0);
        let window = DayNightWindow::compute(TEST_STANDARD_START, TEST_STANDARD_END, &now);

        assert_eq!(window.current_period(), Period::Night);
        assert_eq!(window.next_day_begin, utc(2025, 1, 15, 8, 0, 0));
        assert_eq!(window.next_night_begin, utc(2025, 1, 15, 20, 0, 0));
        assert_eq!(window.next_boundary(), (Period::Day, &utc(2025, 1, 15, 8, 0, 0)));
        assert_eq!(window.time_until_next_boundary(&now), StdDuration::from_secs(2 * 3600));
    }

    #[test]
    fn test_window_midday_is_day() {
        let now = utc(2025, 1, 15, 12, 30, 0);
        let window = DayNightWindow::compute(TEST_STANDARD_START, TEST_STANDARD_END, &now);

        assert_eq!(window.current_period(), Period::Day);
        assert_eq!(window.next_day_begin, utc(2025, 1, 16, 8, 0, 0));
        assert_eq!(window.next_night_begin, utc(2025, 1, 15, 20, 0, 0));
    }

    #[test]
    fn test_window_late_evening_is_night() {
        let now = utc(2025, 1, 15, 21, 0, 0);
        let window = DayNightWindow::compute(TEST_STANDARD_START, TEST_STANDARD_END, &now);

        assert_eq!(window.current_period(), Period::Night);
        assert_eq!(window.next_night_begin, utc(2025, 1, 16, 20, 0, 0));
        assert_eq!(window.next_day_begin, utc(2025, 1, 16, 8, 0, 0));
    }

    #[test]
    fn test_window_inverted_settings() {
        // Day begins at 23:30 and night at 00:30: one hour of "day" around midnight
        let inside = utc(2025, 1, 15, 23, 45, 0);
        let window = DayNightWindow::compute(TEST_LATE_START, TEST_EARLY_END, &inside);
        assert_eq!(window.current_period(), Period::Day);

        let outside = utc(2025, 1, 15, 12, 0, 0);
        let window = DayNightWindow::compute(TEST_LATE_START, TEST_EARLY_END, &outside);
        assert_eq!(window.current_period(), Period::Night);
    }

    #[test]
    fn test_window_begin_of() {
        let now = utc(2025, 1, 15, 6, 0, 0);
        let window = DayNightWindow::compute(TEST_STANDARD_START, TEST_STANDARD_END, &now);
        assert_eq!(window.begin_of(Period::Day), &window.next_day_begin);
        assert_eq!(window.begin_of(Period::Night), &window.next_night_begin);
    }

    #[test]
    fn test_period_display_and_opposite() {
        assert_eq!(Period::Day.to_string(), "day");
        assert_eq!(Period::Night.to_string(), "night");
        assert_eq!(Period::Day.opposite(), Period::Night);
        assert_eq!(Period::Night.opposite(), Period::Day);
    }
}
