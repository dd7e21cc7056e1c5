//! Defines the `ModelParameters` struct, which represents the contents of `model.toml`.
use crate::input::{input_err_msg, read_toml};
use crate::scenario::{Scenario, default_sweep};
use crate::time::days_in_year;
use crate::topology::district::Sizing;
use crate::topology::power_plant::PowerPlant;
use crate::units::MoneyPerEnergy;
use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use serde::Deserialize;
use std::path::Path;
use strum::IntoEnumIterator;

const MODEL_PARAMETERS_FILE_NAME: &str = "model.toml";

/// Gas price in EUR/mmBTU
const GAS_PRICE_PER_MMBTU: f64 = 3.66;

/// kWh per mmBTU
const KWH_PER_MMBTU: f64 = 293.07;

fn default_gas_price() -> MoneyPerEnergy {
    MoneyPerEnergy::new(GAS_PRICE_PER_MMBTU / KWH_PER_MMBTU * 1000.0)
}

fn default_power_plants() -> Vec<PowerPlant> {
    PowerPlant::iter().collect()
}

/// Represents the contents of the entire model file.
#[derive(Debug, Deserialize, PartialEq)]
pub struct ModelParameters {
    /// The calendar year to simulate
    pub year: u32,
    /// The number of days to simulate, starting on 1 January
    pub days: u32,
    /// Target mean day-ahead price. The historical mean is used if omitted.
    pub day_ahead_mean: Option<MoneyPerEnergy>,
    /// Target mean intraday price. The historical mean is used if omitted.
    pub intraday_mean: Option<MoneyPerEnergy>,
    /// Future-base contract price. The future price table is used if omitted.
    pub future_base_price: Option<MoneyPerEnergy>,
    /// Future-peak contract price. The future price table is used if omitted.
    pub future_peak_price: Option<MoneyPerEnergy>,
    /// Price of gas for the district
    #[serde(default = "default_gas_price")]
    pub gas_price: MoneyPerEnergy,
    /// Plant sizes for the district
    #[serde(default)]
    pub sizing: Sizing,
    /// Price scenarios to run for the district
    #[serde(default = "default_sweep")]
    pub scenarios: Vec<Scenario>,
    /// Plants to compare
    #[serde(default = "default_power_plants")]
    pub power_plants: Vec<PowerPlant>,
}

/// Check that the simulation window lies within the year
fn check_days(year: u32, days: u32) -> Result<()> {
    ensure!(
        (1..=days_in_year(year)).contains(&days),
        "days must be between 1 and {} for {year}",
        days_in_year(year)
    );

    Ok(())
}

/// Check that an optional price is finite
fn check_price(name: &str, price: Option<MoneyPerEnergy>) -> Result<()> {
    if let Some(price) = price {
        ensure!(price.is_finite(), "{name} must be a finite number");
    }

    Ok(())
}

/// Check that scenarios are valid and have distinct names
fn check_scenarios(scenarios: &[Scenario]) -> Result<()> {
    ensure!(!scenarios.is_empty(), "scenarios cannot be empty");
    for scenario in scenarios {
        scenario.validate()?;
    }
    ensure!(
        scenarios.iter().map(ToString::to_string).all_unique(),
        "Each scenario must appear only once"
    );

    Ok(())
}

impl ModelParameters {
    /// Read a model file from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    ///
    /// # Returns
    ///
    /// The model file contents as a [`ModelParameters`] struct or an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<ModelParameters> {
        let file_path = model_dir.as_ref().join(MODEL_PARAMETERS_FILE_NAME);
        let model_params: ModelParameters = read_toml(&file_path)?;

        model_params
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(model_params)
    }

    /// Parse and validate the contents of a model file
    pub fn from_toml_str(contents: &str) -> Result<ModelParameters> {
        let model_params: ModelParameters = toml::from_str(contents)?;
        model_params.validate()?;

        Ok(model_params)
    }

    /// Validate parameters after reading in file
    fn validate(&self) -> Result<()> {
        check_days(self.year, self.days)?;

        check_price("day_ahead_mean", self.day_ahead_mean)?;
        check_price("intraday_mean", self.intraday_mean)?;
        check_price("future_base_price", self.future_base_price)?;
        check_price("future_peak_price", self.future_peak_price)?;
        check_price("gas_price", Some(self.gas_price))?;

        self.sizing.validate().context("Invalid sizing")?;
        check_scenarios(&self.scenarios)?;
        ensure!(
            self.power_plants.iter().all_unique(),
            "Each power plant must appear only once"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_model_params_from_path() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(MODEL_PARAMETERS_FILE_NAME),
            "year = 2020\ndays = 7\nfuture_base_price = 39.5\n",
        )
        .unwrap();

        let params = ModelParameters::from_path(dir.path()).unwrap();
        assert_eq!(params.year, 2020);
        assert_eq!(params.day_ahead_mean, None);
        assert_eq!(params.future_base_price, Some(MoneyPerEnergy(39.5)));
        assert_approx_eq!(f64, params.gas_price.value(), 12.4885, epsilon = 1e-4);
        assert_eq!(params.scenarios, default_sweep());
        assert_eq!(params.power_plants.len(), 5);
        assert_eq!(params.sizing, Sizing::default());
    }

    #[test]
    fn test_model_params_from_toml_str() {
        let params = ModelParameters::from_toml_str(
            "year = 2021\ndays = 1\nscenarios = [{ kind = \"baseline\" }]\n",
        )
        .unwrap();
        assert_eq!(params.scenarios, [Scenario::Baseline]);
        assert!(ModelParameters::from_toml_str("year = 2021\ndays = 0\n").is_err());
    }

    #[test]
    fn test_model_params_invalid() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(MODEL_PARAMETERS_FILE_NAME),
            "year = 2021\ndays = 366\n",
        )
        .unwrap();

        assert!(ModelParameters::from_path(dir.path()).is_err());
    }

    #[rstest]
    #[case(2020, 366, true)]
    #[case(2021, 365, true)]
    #[case(2021, 366, false)]
    #[case(2020, 0, false)]
    fn test_check_days(#[case] year: u32, #[case] days: u32, #[case] valid: bool) {
        assert_eq!(check_days(year, days).is_ok(), valid);
    }

    #[test]
    fn test_check_price() {
        check_price("gas_price", None).unwrap();
        assert_error!(
            check_price("gas_price", Some(MoneyPerEnergy(f64::NAN))),
            "gas_price must be a finite number"
        );
    }

    #[test]
    fn test_check_scenarios() {
        check_scenarios(&default_sweep()).unwrap();
        assert!(check_scenarios(&[]).is_err());
        assert_error!(
            check_scenarios(&[Scenario::Baseline, Scenario::Baseline]),
            "Each scenario must appear only once"
        );
        assert!(check_scenarios(&[Scenario::DayAheadInflated(-2.0)]).is_err());
    }
}
