//! The electricity markets into which surplus power can be sold.
use crate::time::iso_weekday;
use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// First hour of the future-peak delivery window
pub const PEAK_START_HOUR: u32 = 8;

/// First hour after the future-peak delivery window (so the last traded step starts at 20:45)
pub const PEAK_END_HOUR: u32 = 21;

/// Last ISO weekday in the future-peak delivery window (Friday)
pub const PEAK_LAST_WEEKDAY: u32 = 5;

/// A market channel
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Market {
    /// Sold one day in advance; one price per clock hour
    DayAhead,
    /// Sold close to delivery; one price per dispatch step
    Intraday,
    /// Forward contract with one price for the whole year
    FutureBase,
    /// Forward contract with one price for weekday daytime hours
    FuturePeak,
}

/// Whether the given instant falls inside the future-peak delivery window.
///
/// The window covers Monday to Friday, from 08:00 up to (but not including) 21:00.
pub fn is_future_peak_window(instant: NaiveDateTime) -> bool {
    (PEAK_START_HOUR..PEAK_END_HOUR).contains(&instant.hour())
        && iso_weekday(instant.date()) <= PEAK_LAST_WEEKDAY
}
