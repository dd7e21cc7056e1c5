//! The module responsible for writing output data to disk.
use crate::market::Market;
use crate::price::PriceSeries;
use crate::simulation::kpi::PlantKpiRow;
use crate::time::Timeline;
use crate::timeline::MarketTimeline;
use crate::topology::EdgeID;
use anyhow::{Context, Result, ensure};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub mod metadata;

/// The output file name for the assembled market prices
const MARKET_PRICES_FILE_NAME: &str = "market_prices.csv";

/// The output file name for the power plant KPIs
const POWER_PLANT_KPIS_FILE_NAME: &str = "power_plant_kpis.csv";

/// Format used for the `time` column of output files
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Get the default output directory for the model in the specified directory.
///
/// This is a folder named after the model directory inside `results_root`.
pub fn get_output_dir(results_root: &Path, model_dir: &Path) -> Result<PathBuf> {
    // Canonicalise in case the user has specified "."
    let model_dir = model_dir
        .canonicalize()
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    Ok(results_root.join(model_name))
}

/// Create a new output directory, if it doesn't already exist.
///
/// An existing directory with files in it is only reused if `allow_overwrite` is true.
///
/// # Returns
///
/// Whether an existing non-empty directory is being reused.
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    if output_dir.is_dir() {
        let is_empty = output_dir.read_dir()?.next().is_none();
        if is_empty {
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. Use --overwrite to replace its contents."
        );
        return Ok(true);
    }

    fs::create_dir_all(output_dir)?;

    Ok(false)
}

fn format_time(time: NaiveDateTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// A row of a flows CSV file
#[derive(Serialize, Debug, PartialEq)]
struct FlowRow<'a> {
    timestep: usize,
    time: String,
    source: &'a str,
    sink: &'a str,
    flow: f64,
}

/// A row of the market prices CSV file
#[derive(Serialize, Debug, PartialEq)]
struct MarketPriceRow {
    timestep: usize,
    time: String,
    day_ahead: f64,
    intraday: f64,
    future_base: f64,
    future_peak: f64,
}

/// A row of a synthesised price series CSV file
#[derive(Serialize, Debug, PartialEq)]
struct PriceRow {
    time: String,
    price: f64,
}

/// Writes the output files for a run into one folder
pub struct DataWriter {
    output_path: PathBuf,
    debug_model: bool,
}

impl DataWriter {
    /// Create a writer for the given folder
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    /// * `debug_model` - Whether to write extra CSV files for debugging the model
    pub fn new(output_path: &Path, debug_model: bool) -> Self {
        Self {
            output_path: output_path.to_path_buf(),
            debug_model,
        }
    }

    /// The folder files are written to
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Write the market prices for the simulation window
    pub fn write_market_prices(&self, prices: &MarketTimeline) -> Result<()> {
        write_market_prices(&self.output_path.join(MARKET_PRICES_FILE_NAME), prices)
    }

    /// Write the prices a scenario was solved with (debug only)
    pub fn write_scenario_prices(&self, scenario_name: &str, prices: &MarketTimeline) -> Result<()> {
        if !self.debug_model {
            return Ok(());
        }

        let file_name = format!("debug_market_prices_{scenario_name}.csv");
        write_market_prices(&self.output_path.join(file_name), prices)
    }

    /// Write the solved flows for a scenario
    pub fn write_scenario_flows<'a, I>(
        &self,
        scenario_name: &str,
        timeline: &Timeline,
        flows: I,
    ) -> Result<()>
    where
        I: IntoIterator<Item = (&'a EdgeID, &'a [f64])>,
    {
        let file_name = format!("flows_{scenario_name}.csv");
        write_flows(&self.output_path.join(file_name), timeline, flows)
    }

    /// Write the solved flows for a power plant
    pub fn write_power_plant_flows<'a, I>(
        &self,
        plant_name: &str,
        timeline: &Timeline,
        flows: I,
    ) -> Result<()>
    where
        I: IntoIterator<Item = (&'a EdgeID, &'a [f64])>,
    {
        let file_name = format!("power_plant_flows_{plant_name}.csv");
        write_flows(&self.output_path.join(file_name), timeline, flows)
    }

    /// Write the KPI table for all power plants
    pub fn write_power_plant_kpis<I>(&self, rows: I) -> Result<()>
    where
        I: IntoIterator<Item = PlantKpiRow>,
    {
        let file_path = self.output_path.join(POWER_PLANT_KPIS_FILE_NAME);
        let mut writer = csv::Writer::from_path(&file_path)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;

        Ok(())
    }
}

/// Write flows as a long table with one row per flow per step
fn write_flows<'a, I>(file_path: &Path, timeline: &Timeline, flows: I) -> Result<()>
where
    I: IntoIterator<Item = (&'a EdgeID, &'a [f64])>,
{
    let mut writer = csv::Writer::from_path(file_path)?;
    for (edge, values) in flows {
        for ((timestep, time), &flow) in timeline.iter().enumerate().zip(values) {
            writer.serialize(FlowRow {
                timestep,
                time: format_time(time),
                source: &edge.source.0,
                sink: &edge.sink.0,
                flow,
            })?;
        }
    }
    writer.flush()?;

    Ok(())
}

fn write_market_prices(file_path: &Path, prices: &MarketTimeline) -> Result<()> {
    let mut writer = csv::Writer::from_path(file_path)?;
    for (timestep, time) in prices.timeline().iter().enumerate() {
        writer.serialize(MarketPriceRow {
            timestep,
            time: format_time(time),
            day_ahead: prices.get(Market::DayAhead)[timestep],
            intraday: prices.get(Market::Intraday)[timestep],
            future_base: prices.get(Market::FutureBase)[timestep],
            future_peak: prices.get(Market::FuturePeak)[timestep],
        })?;
    }
    writer.flush()?;

    Ok(())
}

/// Write a synthesised price series at its native resolution
pub fn write_price_series(file_path: &Path, series: &PriceSeries) -> Result<()> {
    let mut writer = csv::Writer::from_path(file_path)?;
    for (time, price) in series.iter() {
        writer.serialize(PriceRow {
            time: format_time(time),
            price,
        })?;
    }
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, market_timeline};
    use crate::time::Resolution;
    use chrono::NaiveDate;
    use rstest::rstest;
    use std::iter;
    use tempfile::tempdir;

    fn read_lines(file_path: &Path) -> Vec<String> {
        fs::read_to_string(file_path)
            .unwrap()
            .lines()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn test_get_output_dir() {
        let dir = tempdir().unwrap();
        let model_dir = dir.path().join("winter_day");
        fs::create_dir(&model_dir).unwrap();

        assert_eq!(
            get_output_dir(Path::new("elmarkets_results"), &model_dir).unwrap(),
            Path::new("elmarkets_results/winter_day")
        );
        assert!(get_output_dir(Path::new("results"), &dir.path().join("missing")).is_err());
    }

    #[test]
    fn test_create_output_directory() {
        let dir = tempdir().unwrap();
        let output_dir = dir.path().join("results");

        // New and empty directories are fine
        assert!(!create_output_directory(&output_dir, false).unwrap());
        assert!(!create_output_directory(&output_dir, false).unwrap());

        // Non-empty ones need permission
        fs::write(output_dir.join("flows_baseline.csv"), "").unwrap();
        assert_error!(
            create_output_directory(&output_dir, false),
            "Output folder already exists and is not empty. Use --overwrite to replace its contents."
        );
        assert!(create_output_directory(&output_dir, true).unwrap());
    }

    #[test]
    fn test_write_flows() {
        let dir = tempdir().unwrap();
        let start = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let timeline = Timeline::new(start, Resolution::QuarterHourly, 2);
        let edge = EdgeID::new("b_el_out", "s_da");
        let values = [1.5, 2.0];

        let writer = DataWriter::new(dir.path(), false);
        writer
            .write_scenario_flows("baseline", &timeline, iter::once((&edge, &values[..])))
            .unwrap();

        assert_eq!(
            read_lines(&dir.path().join("flows_baseline.csv")),
            [
                "timestep,time,source,sink,flow",
                "0,2020-01-01 00:00,b_el_out,s_da,1.5",
                "1,2020-01-01 00:15,b_el_out,s_da,2.0"
            ]
        );
    }

    #[rstest]
    fn test_write_market_prices(market_timeline: MarketTimeline) {
        let dir = tempdir().unwrap();
        let writer = DataWriter::new(dir.path(), false);
        writer.write_market_prices(&market_timeline).unwrap();

        let lines = read_lines(&dir.path().join(MARKET_PRICES_FILE_NAME));
        assert_eq!(lines.len(), market_timeline.len() + 1);
        assert_eq!(
            lines[0],
            "timestep,time,day_ahead,intraday,future_base,future_peak"
        );

        // Scenario prices are only written when debugging
        writer
            .write_scenario_prices("baseline", &market_timeline)
            .unwrap();
        assert!(!dir.path().join("debug_market_prices_baseline.csv").exists());
        DataWriter::new(dir.path(), true)
            .write_scenario_prices("baseline", &market_timeline)
            .unwrap();
        assert!(dir.path().join("debug_market_prices_baseline.csv").exists());
    }
}
