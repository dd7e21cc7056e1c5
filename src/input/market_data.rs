//! Code for reading the historical mean and future contract price tables.
use super::{input_err_msg, is_sorted_and_unique, read_csv, read_csv_optional};
use crate::price::{HistoricalMean, HistoricalMeans};
use crate::timeline::FuturePrices;
use crate::units::MoneyPerEnergy;
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

const HISTORICAL_MEANS_FILE_NAME: &str = "historical_means.csv";
const FUTURE_BASE_PRICES_FILE_NAME: &str = "future_base_prices.csv";
const FUTURE_PEAK_PRICES_FILE_NAME: &str = "future_peak_prices.csv";

#[derive(Debug, PartialEq, Deserialize)]
struct HistoricalMeanRaw {
    year: u32,
    day_ahead: MoneyPerEnergy,
    intraday: MoneyPerEnergy,
}

#[derive(Debug, PartialEq, Deserialize)]
struct YearPriceRaw {
    year: u32,
    price: MoneyPerEnergy,
}

/// Read the table of historical mean day-ahead and intraday prices.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
pub fn read_historical_means(model_dir: &Path) -> Result<HistoricalMeans> {
    let file_path = model_dir.join(HISTORICAL_MEANS_FILE_NAME);
    let iter = read_csv::<HistoricalMeanRaw>(&file_path)?;
    read_historical_means_from_iter(iter).with_context(|| input_err_msg(&file_path))
}

fn read_historical_means_from_iter<I>(iter: I) -> Result<HistoricalMeans>
where
    I: Iterator<Item = HistoricalMeanRaw>,
{
    let raw: Vec<_> = iter.collect();
    ensure!(
        is_sorted_and_unique(raw.iter().map(|row| row.year)),
        "Years must be in order and appear only once"
    );

    let mut means = BTreeMap::new();
    for row in raw {
        ensure!(
            row.day_ahead.is_finite() && row.intraday.is_finite(),
            "Mean prices for {} must be finite",
            row.year
        );
        means.insert(
            row.year,
            HistoricalMean {
                day_ahead: row.day_ahead,
                intraday: row.intraday,
            },
        );
    }

    Ok(HistoricalMeans::new(means))
}

/// Read the optional future-base and future-peak price tables.
///
/// A missing file gives an empty table for that contract.
pub fn read_future_prices(model_dir: &Path) -> Result<FuturePrices> {
    let base = read_year_prices(&model_dir.join(FUTURE_BASE_PRICES_FILE_NAME))?;
    let peak = read_year_prices(&model_dir.join(FUTURE_PEAK_PRICES_FILE_NAME))?;

    Ok(FuturePrices::new(base, peak))
}

fn read_year_prices(file_path: &Path) -> Result<BTreeMap<u32, MoneyPerEnergy>> {
    let Some(iter) = read_csv_optional::<YearPriceRaw>(file_path)? else {
        return Ok(BTreeMap::new());
    };

    read_year_prices_from_iter(iter).with_context(|| input_err_msg(file_path))
}

fn read_year_prices_from_iter<I>(iter: I) -> Result<BTreeMap<u32, MoneyPerEnergy>>
where
    I: Iterator<Item = YearPriceRaw>,
{
    let mut prices = BTreeMap::new();
    for row in iter {
        ensure!(
            row.price.is_finite(),
            "Price for {} must be finite",
            row.year
        );
        ensure!(
            prices.insert(row.year, row.price).is_none(),
            "Year {} appears more than once",
            row.year
        );
    }

    Ok(prices)
}
