//! Key performance indicators for a solved power plant.
use crate::market::Market;
use crate::simulation::DispatchResult;
use crate::time::DISPATCH_RESOLUTION;
use crate::timeline::MarketTimeline;
use crate::topology::{EdgeID, MarketEdges};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Serialize;

/// Energy delivered by a flow over the horizon (flow is a power, so divide by steps per hour)
pub fn energy(flow: &[f64]) -> f64 {
    flow.iter().sum::<f64>() / DISPATCH_RESOLUTION.steps_per_hour() as f64
}

/// Income from selling a flow at the given prices
pub fn income(flow: &[f64], prices: &[f64]) -> f64 {
    flow.iter()
        .zip(prices)
        .map(|(flow, price)| flow * price)
        .sum::<f64>()
        / DISPATCH_RESOLUTION.steps_per_hour() as f64
}

/// The KPIs for one power plant
#[derive(Debug, Clone, PartialEq)]
pub struct PlantKpis {
    /// Energy generated by the plant
    pub generation: f64,
    /// Energy sold on each market
    pub energy_sold: IndexMap<Market, f64>,
    /// Income from each market
    pub income: IndexMap<Market, f64>,
}

impl PlantKpis {
    /// Compute KPIs from a solved dispatch
    ///
    /// # Arguments
    ///
    /// * `result` - The solved flows
    /// * `generation_edge` - The flow out of the plant
    /// * `market_edges` - The sell flow for each market
    /// * `prices` - The prices the flows were sold at
    pub fn compute(
        result: &DispatchResult,
        generation_edge: &EdgeID,
        market_edges: &MarketEdges,
        prices: &MarketTimeline,
    ) -> Result<Self> {
        let get_flow = |edge: &EdgeID| {
            result
                .flows
                .get(edge)
                .with_context(|| format!("No solved flow for {edge}"))
        };

        let generation = energy(get_flow(generation_edge)?);
        let mut energy_sold = IndexMap::new();
        let mut market_income = IndexMap::new();
        for (&market, edge) in market_edges {
            let flow = get_flow(edge)?;
            energy_sold.insert(market, energy(flow));
            market_income.insert(market, income(flow, prices.get(market)));
        }

        Ok(Self {
            generation,
            energy_sold,
            income: market_income,
        })
    }

    /// Income summed over all markets
    pub fn total_income(&self) -> f64 {
        self.income.values().sum()
    }

    /// Total income per unit of energy generated, or `None` if nothing was generated
    pub fn average_price(&self) -> Option<f64> {
        (self.generation > 0.0).then(|| self.total_income() / self.generation)
    }
}

/// A row of the power plant KPI table
#[derive(Debug, Serialize, PartialEq)]
pub struct PlantKpiRow {
    plant: String,
    generation: f64,
    day_ahead_income: f64,
    intraday_income: f64,
    future_base_income: f64,
    future_peak_income: f64,
    total_income: f64,
    average_price: Option<f64>,
}

impl PlantKpiRow {
    /// Create a row for a named plant
    pub fn new(plant: &str, kpis: &PlantKpis) -> Self {
        let income = |market| kpis.income.get(&market).copied().unwrap_or_default();
        Self {
            plant: plant.to_string(),
            generation: kpis.generation,
            day_ahead_income: income(Market::DayAhead),
            intraday_income: income(Market::Intraday),
            future_base_income: income(Market::FutureBase),
            future_peak_income: income(Market::FuturePeak),
            total_income: kpis.total_income(),
            average_price: kpis.average_price(),
        }
    }
}
