//! Code for working with the calendar and equally spaced time indices.
//!
//! All timelines use a naive civil calendar: there are no daylight saving transitions, so a year
//! always has exactly 24 hours per day, and leap years only change the number of days.
use anyhow::{Context, Result};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

/// The native resolution of a price series or timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolution {
    /// One value per clock hour (day-ahead prices)
    Hourly,
    /// One value per 15 minutes (dispatch, intraday prices)
    QuarterHourly,
}

impl Resolution {
    /// The length of one step in minutes
    pub fn minutes(self) -> u32 {
        match self {
            Self::Hourly => 60,
            Self::QuarterHourly => 15,
        }
    }

    /// The number of steps in one clock hour
    pub fn steps_per_hour(self) -> usize {
        (60 / self.minutes()) as usize
    }

    /// The number of steps in one day
    pub fn steps_per_day(self) -> usize {
        24 * self.steps_per_hour()
    }

    /// The index of the given instant within its day
    pub fn step_of_day(self, instant: NaiveDateTime) -> usize {
        ((instant.hour() * 60 + instant.minute()) / self.minutes()) as usize
    }
}

/// The resolution at which the optimisation decides flows
pub const DISPATCH_RESOLUTION: Resolution = Resolution::QuarterHourly;

/// Determine whether a year is a leap year
pub fn is_leap_year(year: u32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

/// The number of days in the given calendar year
pub fn days_in_year(year: u32) -> u32 {
    if is_leap_year(year) { 366 } else { 365 }
}

/// Get the first day of the given calendar year
pub fn first_day_of_year(year: u32) -> Result<NaiveDate> {
    i32::try_from(year)
        .ok()
        .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1))
        .with_context(|| format!("Year {year} is outside the supported calendar range"))
}

/// An ordered sequence of equally spaced instants
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    start: NaiveDateTime,
    resolution: Resolution,
    len: usize,
}

impl Timeline {
    /// Create a timeline starting at `start` with `len` steps
    pub fn new(start: NaiveDateTime, resolution: Resolution, len: usize) -> Self {
        Self {
            start,
            resolution,
            len,
        }
    }

    /// Create a timeline covering the whole of a calendar year
    pub fn for_year(year: u32, resolution: Resolution) -> Result<Self> {
        let start = first_day_of_year(year)?.and_time(NaiveTime::MIN);
        let len = days_in_year(year) as usize * resolution.steps_per_day();

        Ok(Self::new(start, resolution, len))
    }

    /// The first instant of the timeline
    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    /// The spacing between instants
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// The number of instants
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the timeline has no instants
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get the instant at step `index`
    pub fn get(&self, index: usize) -> Option<NaiveDateTime> {
        (index < self.len).then(|| self.instant_at(index))
    }

    fn instant_at(&self, index: usize) -> NaiveDateTime {
        self.start + Duration::minutes(index as i64 * self.resolution.minutes() as i64)
    }

    /// Iterate over the instants in order
    pub fn iter(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        (0..self.len).map(|index| self.instant_at(index))
    }

    /// Iterate over the days covered by the timeline
    pub fn iter_days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        let steps_per_day = self.resolution.steps_per_day();
        (0..self.len.div_ceil(steps_per_day))
            .map(move |day| self.instant_at(day * steps_per_day).date())
    }

    /// A timeline with the same start and resolution, covering only the first `len` steps
    pub fn head(&self, len: usize) -> Self {
        Self::new(self.start, self.resolution, len.min(self.len))
    }
}

/// The ISO weekday number (1 = Monday, 7 = Sunday) of a date
pub fn iso_weekday(date: NaiveDate) -> u32 {
    date.weekday().number_from_monday()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(2020, true)]
    #[case(2021, false)]
    #[case(1900, false)]
    #[case(2000, true)]
    fn test_is_leap_year(#[case] year: u32, #[case] expected: bool) {
        assert_eq!(is_leap_year(year), expected);
    }

    #[rstest]
    #[case(2020, Resolution::Hourly, 8784)]
    #[case(2021, Resolution::Hourly, 8760)]
    #[case(2020, Resolution::QuarterHourly, 35136)]
    #[case(2021, Resolution::QuarterHourly, 35040)]
    fn test_timeline_for_year(
        #[case] year: u32,
        #[case] resolution: Resolution,
        #[case] expected_len: usize,
    ) {
        let timeline = Timeline::for_year(year, resolution).unwrap();
        assert_eq!(timeline.len(), expected_len);
        assert_eq!(timeline.iter().count(), expected_len);

        // Strictly ascending with no gaps
        let step = Duration::minutes(resolution.minutes() as i64);
        assert!(
            timeline
                .iter()
                .zip(timeline.iter().skip(1))
                .all(|(a, b)| b - a == step)
        );

        // Last instant is the final step of 31 December
        let last = timeline.get(expected_len - 1).unwrap();
        assert_eq!((last.month(), last.day()), (12, 31));
        assert_eq!(resolution.step_of_day(last), resolution.steps_per_day() - 1);
        assert!(timeline.get(expected_len).is_none());
    }

    #[test]
    fn test_iter_days() {
        let timeline = Timeline::for_year(2020, Resolution::QuarterHourly).unwrap();
        assert_eq!(timeline.iter_days().count(), 366);
        assert_eq!(timeline.head(97).iter_days().count(), 2);
    }

    #[test]
    fn test_iso_weekday() {
        // 1 January 2020 was a Wednesday
        let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        assert_eq!(iso_weekday(date), 3);
    }

    #[test]
    fn test_first_day_of_year_out_of_range() {
        assert!(first_day_of_year(u32::MAX).is_err());
    }
}
