//! Code for reading the hourly boundary data CSV file.
use super::{input_err_msg, read_csv};
use crate::boundary::{BoundaryData, BoundaryHour};
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::path::Path;

const BOUNDARY_FILE_NAME: &str = "boundary.csv";

#[derive(Debug, PartialEq, Deserialize)]
struct BoundaryHourRaw {
    electricity: f64,
    heat: f64,
    pv_pu: f64,
    wind_pu: f64,
}

/// Read hourly boundary data, starting from midnight on 1 January of the model year.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// The data at dispatch resolution.
pub fn read_boundary_data(model_dir: &Path) -> Result<BoundaryData> {
    let file_path = model_dir.join(BOUNDARY_FILE_NAME);
    let iter = read_csv::<BoundaryHourRaw>(&file_path)?;
    read_boundary_data_from_iter(iter).with_context(|| input_err_msg(&file_path))
}

fn read_boundary_data_from_iter<I>(iter: I) -> Result<BoundaryData>
where
    I: Iterator<Item = BoundaryHourRaw>,
{
    let mut hours = Vec::new();
    for (index, raw) in iter.enumerate() {
        ensure!(
            raw.electricity >= 0.0 && raw.heat >= 0.0,
            "Demand must be non-negative (hour {index})"
        );
        ensure!(
            (0.0..=1.0).contains(&raw.pv_pu) && (0.0..=1.0).contains(&raw.wind_pu),
            "Per-unit generation must be between 0 and 1 (hour {index})"
        );

        hours.push(BoundaryHour {
            electricity: raw.electricity,
            heat: raw.heat,
            pv_pu: raw.pv_pu,
            wind_pu: raw.wind_pu,
        });
    }

    Ok(BoundaryData::from_hourly(&hours))
}
