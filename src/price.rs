//! Synthesis of day-ahead and intraday price series from categorical shapes.
//!
//! A full year of prices is built at the market's native resolution by looking up the shape for
//! each day's (month, weekday) and concatenating the shapes. The result is then rescaled linearly
//! so that its arithmetic mean equals a target mean, which is either given explicitly or taken
//! from the historical means table.
use crate::error::MarketError;
use crate::market::Market;
use crate::time::{Resolution, Timeline, iso_weekday};
use crate::units::MoneyPerEnergy;
use anyhow::{Result, bail, ensure};
use chrono::Datelike;
use log::debug;
use std::collections::BTreeMap;

pub mod shape;
use shape::ShapeTable;

/// Mean day-ahead and intraday prices for one historical year
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoricalMean {
    /// Mean day-ahead price
    pub day_ahead: MoneyPerEnergy,
    /// Mean intraday price
    pub intraday: MoneyPerEnergy,
}

/// Historical mean prices, keyed by year
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoricalMeans(BTreeMap<u32, HistoricalMean>);

impl HistoricalMeans {
    /// Create a new table from a map of years to means
    pub fn new(means: BTreeMap<u32, HistoricalMean>) -> Self {
        Self(means)
    }

    /// Look up the historical mean for a year and market.
    ///
    /// Returns `None` for years outside the table and for the futures markets.
    pub fn get(&self, year: u32, market: Market) -> Option<MoneyPerEnergy> {
        let mean = self.0.get(&year)?;
        match market {
            Market::DayAhead => Some(mean.day_ahead),
            Market::Intraday => Some(mean.intraday),
            Market::FutureBase | Market::FuturePeak => None,
        }
    }

    /// Iterate over the years covered by the table
    pub fn years(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.keys().copied()
    }
}

/// A price series for one market, with one value per instant of a timeline
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    market: Market,
    timeline: Timeline,
    values: Vec<f64>,
}

impl PriceSeries {
    /// Create a new price series, checking that there is one value per instant
    pub fn new(market: Market, timeline: Timeline, values: Vec<f64>) -> Result<Self> {
        ensure!(
            values.len() == timeline.len(),
            "{market} series has {} values for {} instants",
            values.len(),
            timeline.len()
        );

        Ok(Self {
            market,
            timeline,
            values,
        })
    }

    /// The market the prices are for
    pub fn market(&self) -> Market {
        self.market
    }

    /// The instants the prices apply to
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// The price values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// The number of values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no values
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The arithmetic mean of the values
    pub fn mean(&self) -> f64 {
        mean(&self.values)
    }

    /// Iterate over instants and prices together
    pub fn iter(&self) -> impl Iterator<Item = (chrono::NaiveDateTime, f64)> + '_ {
        self.timeline.iter().zip(self.values.iter().copied())
    }

    /// Consume the series, returning its values
    pub fn into_values(self) -> Vec<f64> {
        self.values
    }
}

/// Synthesises day-ahead and intraday price series from shape tables
pub struct PriceSynthesizer<'a> {
    day_ahead_shapes: &'a ShapeTable,
    intraday_shapes: &'a ShapeTable,
    historical_means: &'a HistoricalMeans,
}

impl<'a> PriceSynthesizer<'a> {
    /// Create a new synthesiser over the given tables
    pub fn new(
        day_ahead_shapes: &'a ShapeTable,
        intraday_shapes: &'a ShapeTable,
        historical_means: &'a HistoricalMeans,
    ) -> Self {
        Self {
            day_ahead_shapes,
            intraday_shapes,
            historical_means,
        }
    }

    /// Build a full year of prices for a market at its native resolution.
    ///
    /// # Arguments
    ///
    /// * `year` - The calendar year
    /// * `market` - Either [`Market::DayAhead`] or [`Market::Intraday`]
    /// * `target_mean` - The mean of the returned series. If `None`, the historical mean for the
    ///   year is used.
    ///
    /// # Returns
    ///
    /// A series with one value per native-resolution instant of the year. Fails with
    /// [`MarketError::ShapeNotFound`] or [`MarketError::ShapeAmbiguous`] if a day cannot be
    /// resolved to exactly one shape, and with [`MarketError::MissingMean`] if there is no target
    /// mean.
    pub fn synthesize(
        &self,
        year: u32,
        market: Market,
        target_mean: Option<MoneyPerEnergy>,
    ) -> Result<PriceSeries> {
        let (shapes, resolution) = match market {
            Market::DayAhead => (self.day_ahead_shapes, Resolution::Hourly),
            Market::Intraday => (self.intraday_shapes, Resolution::QuarterHourly),
            Market::FutureBase | Market::FuturePeak => {
                bail!("Prices for the {market} market are not synthesised")
            }
        };
        ensure!(
            shapes.resolution() == resolution,
            "The {market} shape table is at the wrong resolution"
        );

        let timeline = Timeline::for_year(year, resolution)?;
        let profile = build_profile(shapes, &timeline)?;

        let target_mean = match target_mean {
            Some(target_mean) => target_mean,
            None => self
                .historical_means
                .get(year, market)
                .ok_or(MarketError::MissingMean { year, market })?,
        };
        ensure!(
            target_mean.is_finite(),
            "Target mean for {market} in {year} must be finite"
        );

        let values = rescale(profile, target_mean.value())?;
        debug!(
            "Synthesised {} {market} prices for {year} with mean {target_mean}",
            values.len()
        );

        PriceSeries::new(market, timeline, values)
    }
}

/// Concatenate the shape for each day of the timeline
fn build_profile(shapes: &ShapeTable, timeline: &Timeline) -> Result<Vec<f64>, MarketError> {
    let mut values = Vec::with_capacity(timeline.len());
    for date in timeline.iter_days() {
        let row = shapes.find(date.month(), iso_weekday(date))?;
        values.extend_from_slice(&row.values);
    }
    values.truncate(timeline.len());

    Ok(values)
}

/// Scale every value by `target_mean / mean(values)`
fn rescale(mut values: Vec<f64>, target_mean: f64) -> Result<Vec<f64>> {
    let profile_mean = mean(&values);
    ensure!(
        profile_mean != 0.0 && profile_mean.is_finite(),
        "Cannot rescale a price profile with a mean of {profile_mean}"
    );

    let factor = target_mean / profile_mean;
    for value in &mut values {
        *value *= factor;
    }

    Ok(values)
}

/// The arithmetic mean of the values, or NaN if there are none
pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
