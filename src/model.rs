//! The model: its parameters plus all the input tables read from the model directory.
use crate::boundary::BoundaryData;
use crate::input::boundary::read_boundary_data;
use crate::input::market_data::{read_future_prices, read_historical_means};
use crate::input::shape::read_shape_table;
use crate::market::Market;
use crate::price::shape::ShapeTable;
use crate::price::{HistoricalMeans, PriceSynthesizer};
use crate::time::DISPATCH_RESOLUTION;
use crate::timeline::{FuturePrices, MarketTimeline};
use anyhow::{Context, Result};
use log::info;
use std::path::{Path, PathBuf};

pub mod parameters;
pub use parameters::ModelParameters;

/// Model definition
pub struct Model {
    /// Path to the model folder
    pub model_path: PathBuf,
    /// Parameters from the model TOML file
    pub parameters: ModelParameters,
    /// Hourly day-ahead price shapes
    pub day_ahead_shapes: ShapeTable,
    /// 15-minute intraday price shapes
    pub intraday_shapes: ShapeTable,
    /// Historical mean day-ahead and intraday prices
    pub historical_means: HistoricalMeans,
    /// Tabulated future contract prices
    pub future_prices: FuturePrices,
    /// Demand and generation profiles, from 1 January of the model year
    pub boundary: BoundaryData,
}

impl Model {
    /// Read a model from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<Model> {
        let model_dir = model_dir.as_ref();
        let parameters = ModelParameters::from_path(model_dir)?;
        let model = Model {
            model_path: model_dir.to_path_buf(),
            parameters,
            day_ahead_shapes: read_shape_table(model_dir, Market::DayAhead)?,
            intraday_shapes: read_shape_table(model_dir, Market::Intraday)?,
            historical_means: read_historical_means(model_dir)?,
            future_prices: read_future_prices(model_dir)?,
            boundary: read_boundary_data(model_dir)?,
        };

        // Check the window is covered now rather than partway through a run
        model
            .boundary_window()
            .context("Boundary data does not cover the simulation window")?;

        Ok(model)
    }

    /// The number of dispatch steps in the simulation window
    pub fn dispatch_steps(&self) -> usize {
        self.parameters.days as usize * DISPATCH_RESOLUTION.steps_per_day()
    }

    /// A price synthesiser over the model's shape tables and historical means
    pub fn price_synthesizer(&self) -> PriceSynthesizer<'_> {
        PriceSynthesizer::new(
            &self.day_ahead_shapes,
            &self.intraday_shapes,
            &self.historical_means,
        )
    }

    /// Build the market prices for the simulation window, before any scenario is applied
    pub fn market_timeline(&self) -> Result<MarketTimeline> {
        let params = &self.parameters;
        let year = params.year;
        let future_base_price =
            self.future_prices
                .resolve(year, Market::FutureBase, params.future_base_price)?;
        let future_peak_price =
            self.future_prices
                .resolve(year, Market::FuturePeak, params.future_peak_price)?;
        info!(
            "Assembling market prices for {year} (future base: {future_base_price}, future peak: \
            {future_peak_price})"
        );

        let prices = MarketTimeline::assemble(
            &self.price_synthesizer(),
            year,
            params.day_ahead_mean,
            params.intraday_mean,
            future_base_price,
            future_peak_price,
        )?;

        Ok(prices.head(self.dispatch_steps()))
    }

    /// The boundary data for the simulation window
    pub fn boundary_window(&self) -> Result<BoundaryData> {
        self.boundary.window(self.dispatch_steps())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, write_model_dir};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_model_from_path() {
        let dir = tempdir().unwrap();
        write_model_dir(dir.path(), 2);

        let model = Model::from_path(dir.path()).unwrap();
        assert_eq!(model.dispatch_steps(), 192);
        let prices = model.market_timeline().unwrap();
        assert_eq!(prices.len(), 192);
        assert_eq!(model.boundary_window().unwrap().len(), 192);
    }

    #[test]
    fn test_model_from_path_short_boundary() {
        let dir = tempdir().unwrap();
        write_model_dir(dir.path(), 2);
        fs::write(
            dir.path().join("boundary.csv"),
            "electricity,heat,pv_pu,wind_pu\n50,80,0,0.3\n",
        )
        .unwrap();

        assert_error!(
            Model::from_path(dir.path()),
            "Boundary data does not cover the simulation window"
        );
    }
}
