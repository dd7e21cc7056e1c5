//! Load and generation profiles at dispatch resolution.
use crate::time::{DISPATCH_RESOLUTION, Resolution};
use crate::timeline::upsample;
use anyhow::{Result, ensure};

/// One hour of boundary data
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryHour {
    /// Electricity demand (kW)
    pub electricity: f64,
    /// Heat demand (kW)
    pub heat: f64,
    /// PV output per unit of installed capacity
    pub pv_pu: f64,
    /// Wind output per unit of installed capacity
    pub wind_pu: f64,
}

/// Demand and per-unit generation profiles, starting at the beginning of the model year
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryData {
    /// Electricity demand (kW)
    pub electricity: Vec<f64>,
    /// Heat demand (kW)
    pub heat: Vec<f64>,
    /// PV output per unit of installed capacity
    pub pv_pu: Vec<f64>,
    /// Wind output per unit of installed capacity
    pub wind_pu: Vec<f64>,
}

impl BoundaryData {
    /// Build profiles at dispatch resolution from hourly data, repeating each hour's values
    pub fn from_hourly(hours: &[BoundaryHour]) -> Self {
        let factor = DISPATCH_RESOLUTION.steps_per_hour() / Resolution::Hourly.steps_per_hour();
        let column = |get: fn(&BoundaryHour) -> f64| {
            let hourly: Vec<_> = hours.iter().map(get).collect();
            upsample(&hourly, factor)
        };

        Self {
            electricity: column(|hour| hour.electricity),
            heat: column(|hour| hour.heat),
            pv_pu: column(|hour| hour.pv_pu),
            wind_pu: column(|hour| hour.wind_pu),
        }
    }

    /// The number of dispatch steps covered
    pub fn len(&self) -> usize {
        self.electricity.len()
    }

    /// Whether there is no data
    pub fn is_empty(&self) -> bool {
        self.electricity.is_empty()
    }

    /// The first `steps` dispatch steps of the data
    pub fn window(&self, steps: usize) -> Result<Self> {
        ensure!(
            steps <= self.len(),
            "Boundary data covers {} dispatch steps but {steps} are needed",
            self.len()
        );

        Ok(Self {
            electricity: self.electricity[..steps].to_vec(),
            heat: self.heat[..steps].to_vec(),
            pv_pu: self.pv_pu[..steps].to_vec(),
            wind_pu: self.wind_pu[..steps].to_vec(),
        })
    }

    /// The largest heat demand in the data
    pub fn peak_heat(&self) -> f64 {
        self.heat.iter().copied().fold(0.0, f64::max)
    }
}
