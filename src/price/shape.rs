//! Categorical intra-day price shapes, keyed by month and a range of weekdays.
use crate::error::MarketError;
use crate::time::Resolution;
use anyhow::{Context, Result, bail, ensure};
use std::fmt;
use std::str::FromStr;

/// An inclusive range of ISO weekdays (1 = Monday, 7 = Sunday)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayRange {
    first: u32,
    last: u32,
}

impl DayRange {
    /// Create a new range, checking that both ends are weekdays and in order
    pub fn new(first: u32, last: u32) -> Result<Self> {
        ensure!(
            (1..=7).contains(&first) && (1..=7).contains(&last),
            "Weekdays must be between 1 and 7"
        );
        ensure!(first <= last, "Weekday range {first}-{last} is reversed");

        Ok(Self { first, last })
    }

    /// Whether the range includes the given ISO weekday
    pub fn contains(&self, weekday: u32) -> bool {
        (self.first..=self.last).contains(&weekday)
    }
}

impl FromStr for DayRange {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let parse_day = |day: &str| {
            day.trim()
                .parse::<u32>()
                .with_context(|| format!("Invalid weekday in range: {s}"))
        };

        match s.split_once('-') {
            Some((first, last)) => Self::new(parse_day(first)?, parse_day(last)?),
            None => {
                let day = parse_day(s)?;
                Self::new(day, day)
            }
        }
    }
}

impl fmt::Display for DayRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.first == self.last {
            write!(f, "{}", self.first)
        } else {
            write!(f, "{}-{}", self.first, self.last)
        }
    }
}

/// One intra-day shape, applying to a month and range of weekdays
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeRow {
    /// Calendar month (1-12)
    pub month: u32,
    /// The weekdays this shape applies to
    pub days: DayRange,
    /// One value per step of the day
    pub values: Vec<f64>,
}

/// A table of intra-day price shapes at a single resolution
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeTable {
    resolution: Resolution,
    rows: Vec<ShapeRow>,
}

impl ShapeTable {
    /// Create a new shape table, checking the rows against the resolution.
    ///
    /// Coverage of (month, weekday) pairs is not checked here. Gaps and overlaps are reported by
    /// [`ShapeTable::find`].
    pub fn new(resolution: Resolution, rows: Vec<ShapeRow>) -> Result<Self> {
        let steps_per_day = resolution.steps_per_day();
        for row in &rows {
            ensure!(
                (1..=12).contains(&row.month),
                "Invalid month {} in price shape",
                row.month
            );
            ensure!(
                row.values.len() == steps_per_day,
                "Price shape for month {}, days {} has {} values (expected {steps_per_day})",
                row.month,
                row.days,
                row.values.len()
            );
            if let Some(value) = row.values.iter().find(|value| !value.is_finite()) {
                bail!(
                    "Price shape for month {}, days {} contains a non-finite value ({value})",
                    row.month,
                    row.days
                );
            }
        }

        Ok(Self { resolution, rows })
    }

    /// The resolution of the shapes in this table
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Iterate over the rows in the table
    pub fn iter(&self) -> impl Iterator<Item = &ShapeRow> {
        self.rows.iter()
    }

    /// Find the single shape covering the given month and ISO weekday
    pub fn find(&self, month: u32, weekday: u32) -> Result<&ShapeRow, MarketError> {
        let mut matches = self
            .rows
            .iter()
            .filter(|row| row.month == month && row.days.contains(weekday));

        match (matches.next(), matches.count()) {
            (None, _) => Err(MarketError::ShapeNotFound { month, weekday }),
            (Some(row), 0) => Ok(row),
            (Some(_), others) => Err(MarketError::ShapeAmbiguous {
                month,
                weekday,
                matches: others + 1,
            }),
        }
    }
}
